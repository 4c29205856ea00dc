use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use domains::{DomainError, DomainResult, FriendRepository, FriendRequest, FriendRequestStatus, Friendship};
use uuid::Uuid;

use super::claim;

#[derive(Default)]
pub struct MemoryFriendRepo {
    requests: DashMap<Uuid, FriendRequest>,
    /// Normalized pair -> request id, so at most one request exists per pair
    /// whichever side sent it
    request_index: DashMap<(Uuid, Uuid), Uuid>,
    /// Keyed by the normalized pair
    friendships: DashMap<(Uuid, Uuid), Friendship>,
}

impl MemoryFriendRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self, pred: impl Fn(&FriendRequest) -> bool) -> Vec<FriendRequest> {
        let mut requests: Vec<FriendRequest> = self
            .requests
            .iter()
            .filter(|r| r.status == FriendRequestStatus::Pending && pred(r.value()))
            .map(|r| r.value().clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }
}

#[async_trait]
impl FriendRepository for MemoryFriendRepo {
    async fn insert_request(&self, request: FriendRequest) -> DomainResult<FriendRequest> {
        claim(&self.request_index, Friendship::pair(request.sender_id, request.recipient_id), request.id)
            .map_err(|_| DomainError::conflict("friend request already sent"))?;
        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> DomainResult<Option<FriendRequest>> {
        Ok(self.requests.get(&id).map(|r| r.value().clone()))
    }

    async fn requests_between(&self, a: Uuid, b: Uuid) -> DomainResult<Vec<FriendRequest>> {
        Ok(self
            .requests
            .iter()
            .filter(|r| r.is_between(a, b))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn update_request(&self, request: FriendRequest) -> DomainResult<FriendRequest> {
        let mut stored = self
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| DomainError::not_found("FriendRequest", request.id))?;
        *stored = request;
        Ok(stored.clone())
    }

    async fn delete_request(&self, id: Uuid) -> DomainResult<bool> {
        match self.requests.remove(&id) {
            Some((_, r)) => {
                self.request_index.remove(&Friendship::pair(r.sender_id, r.recipient_id));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_requests_between(&self, a: Uuid, b: Uuid) -> DomainResult<u64> {
        let ids: Vec<Uuid> = self.requests.iter().filter(|r| r.is_between(a, b)).map(|r| r.id).collect();
        let mut removed = 0;
        for id in ids {
            if self.delete_request(id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn list_incoming(&self, user_id: Uuid) -> DomainResult<Vec<FriendRequest>> {
        Ok(self.pending(|r| r.recipient_id == user_id))
    }

    async fn list_outgoing(&self, user_id: Uuid) -> DomainResult<Vec<FriendRequest>> {
        Ok(self.pending(|r| r.sender_id == user_id))
    }

    async fn insert_friendship(&self, friendship: Friendship) -> DomainResult<Friendship> {
        match self.friendships.entry((friendship.user_a, friendship.user_b)) {
            Entry::Occupied(_) => Err(DomainError::conflict("already friends")),
            Entry::Vacant(e) => {
                e.insert(friendship.clone());
                Ok(friendship)
            }
        }
    }

    async fn find_friendship(&self, a: Uuid, b: Uuid) -> DomainResult<Option<Friendship>> {
        Ok(self.friendships.get(&Friendship::pair(a, b)).map(|f| f.value().clone()))
    }

    async fn delete_friendship(&self, a: Uuid, b: Uuid) -> DomainResult<bool> {
        Ok(self.friendships.remove(&Friendship::pair(a, b)).is_some())
    }

    async fn list_friendships(&self, user_id: Uuid) -> DomainResult<Vec<Friendship>> {
        let mut friendships: Vec<Friendship> = self
            .friendships
            .iter()
            .filter(|f| f.involves(user_id))
            .map(|f| f.value().clone())
            .collect();
        friendships.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(friendships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_direction_request_is_rejected_by_index() {
        let repo = MemoryFriendRepo::new();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let req = repo.insert_request(FriendRequest::new(a, b, None)).await.unwrap();
        assert!(repo.insert_request(FriendRequest::new(a, b, None)).await.is_err());

        assert!(repo.delete_request(req.id).await.unwrap());
        repo.insert_request(FriendRequest::new(a, b, None)).await.unwrap();
    }

    #[tokio::test]
    async fn crossed_request_is_rejected_by_pair_index() {
        let repo = MemoryFriendRepo::new();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let req = repo.insert_request(FriendRequest::new(a, b, None)).await.unwrap();
        let crossed = repo.insert_request(FriendRequest::new(b, a, None)).await;
        assert!(matches!(crossed, Err(DomainError::Conflict(_))));
        assert_eq!(repo.requests_between(a, b).await.unwrap().len(), 1);

        assert!(repo.delete_request(req.id).await.unwrap());
        repo.insert_request(FriendRequest::new(b, a, None)).await.unwrap();
    }

    #[tokio::test]
    async fn friendship_unique_per_unordered_pair() {
        let repo = MemoryFriendRepo::new();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        repo.insert_friendship(Friendship::new(a, b)).await.unwrap();
        assert!(repo.insert_friendship(Friendship::new(b, a)).await.is_err());
        assert!(repo.find_friendship(b, a).await.unwrap().is_some());
        assert!(repo.delete_friendship(b, a).await.unwrap());
        assert!(repo.list_friendships(a).await.unwrap().is_empty());
    }
}
