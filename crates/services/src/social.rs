use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use domains::{
    Actor, DomainError, DomainResult, FriendRepository, FriendRequest, FriendRequestStatus, Friendship,
    NewNotification, NotificationKind, User, UserProfile, UserRepository,
};
use serde::Serialize;
use uuid::Uuid;

use crate::notifications::NotificationService;
use crate::validate;

/// A pending request together with the other party's public profile.
#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestView {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub user: Option<UserProfile>,
}

#[derive(Clone)]
pub struct SocialService {
    users: Arc<dyn UserRepository>,
    friends: Arc<dyn FriendRepository>,
    notifier: NotificationService,
}

impl SocialService {
    pub fn new(users: Arc<dyn UserRepository>, friends: Arc<dyn FriendRepository>, notifier: NotificationService) -> Self {
        Self { users, friends, notifier }
    }

    pub async fn send_request(&self, actor: &Actor, recipient_id: Uuid, note: Option<String>) -> DomainResult<FriendRequest> {
        if recipient_id == actor.id {
            return Err(DomainError::validation("you cannot send a friend request to yourself"));
        }
        let recipient = self
            .users
            .find_by_id(recipient_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| DomainError::not_found("User", recipient_id))?;
        if !recipient.preferences.allow_friend_requests {
            return Err(DomainError::forbidden("this user does not accept friend requests"));
        }
        if self.friends.find_friendship(actor.id, recipient_id).await?.is_some() {
            return Err(DomainError::conflict("you are already friends"));
        }
        let existing = self.friends.requests_between(actor.id, recipient_id).await?;
        if existing.iter().any(|r| r.status == FriendRequestStatus::Pending) {
            return Err(DomainError::conflict("a friend request between you is already pending"));
        }
        // Accepted requests from an ended friendship would block the unique
        // (sender, recipient) pair.
        for stale in existing {
            self.friends.delete_request(stale.id).await?;
        }

        let note = validate::optional_text("note", note.as_deref(), 300)?;
        let request = self.friends.insert_request(FriendRequest::new(actor.id, recipient_id, note)).await?;

        let sender_name = self.display_name(actor.id).await;
        let notification = NewNotification::new(
            NotificationKind::FriendRequest,
            "New friend request",
            format!("{sender_name} wants to be your friend"),
        )
        .actor(actor.id)
        .related(request.id)
        .link("/friends/requests");
        self.notifier.notify(recipient_id, &notification).await;
        Ok(request)
    }

    pub async fn incoming(&self, actor: &Actor) -> DomainResult<Vec<FriendRequestView>> {
        let requests = self.friends.list_incoming(actor.id).await?;
        self.with_profiles(requests, |r| r.sender_id).await
    }

    pub async fn outgoing(&self, actor: &Actor) -> DomainResult<Vec<FriendRequestView>> {
        let requests = self.friends.list_outgoing(actor.id).await?;
        self.with_profiles(requests, |r| r.recipient_id).await
    }

    /// Accepting creates the friendship; declining deletes the request so it
    /// can be sent again later. Returns the friendship on accept.
    pub async fn respond(&self, actor: &Actor, request_id: Uuid, accept: bool) -> DomainResult<Option<Friendship>> {
        let mut request = self.pending_request(request_id).await?;
        if request.recipient_id != actor.id {
            return Err(DomainError::forbidden("only the recipient can respond to this request"));
        }

        if !accept {
            self.friends.delete_request(request.id).await?;
            tracing::debug!(%request_id, "friend request declined");
            return Ok(None);
        }

        let friendship = self.friends.insert_friendship(Friendship::new(request.sender_id, request.recipient_id)).await?;
        request.status = FriendRequestStatus::Accepted;
        request.responded_at = Some(Utc::now());
        self.friends.update_request(request.clone()).await?;

        let name = self.display_name(actor.id).await;
        let notification = NewNotification::new(
            NotificationKind::FriendAccepted,
            "Friend request accepted",
            format!("{name} accepted your friend request"),
        )
        .actor(actor.id)
        .related(friendship.id)
        .link(format!("/users/{}", actor.id));
        self.notifier.notify(request.sender_id, &notification).await;
        Ok(Some(friendship))
    }

    pub async fn cancel_request(&self, actor: &Actor, request_id: Uuid) -> DomainResult<()> {
        let request = self.pending_request(request_id).await?;
        if request.sender_id != actor.id {
            return Err(DomainError::forbidden("only the sender can cancel this request"));
        }
        self.friends.delete_request(request.id).await?;
        Ok(())
    }

    pub async fn list_friends(&self, actor: &Actor) -> DomainResult<Vec<UserProfile>> {
        let friendships = self.friends.list_friendships(actor.id).await?;
        let ids: Vec<Uuid> = friendships.iter().map(|f| f.other(actor.id)).collect();
        let by_id = self.profiles(ids.clone()).await?;
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    pub async fn remove_friend(&self, actor: &Actor, friend_id: Uuid) -> DomainResult<()> {
        if !self.friends.delete_friendship(actor.id, friend_id).await? {
            return Err(DomainError::not_found("Friendship", friend_id));
        }
        self.friends.delete_requests_between(actor.id, friend_id).await?;
        tracing::debug!(user_id = %actor.id, %friend_id, "friendship removed");
        Ok(())
    }

    async fn pending_request(&self, id: Uuid) -> DomainResult<FriendRequest> {
        let request = self
            .friends
            .find_request(id)
            .await?
            .ok_or_else(|| DomainError::not_found("FriendRequest", id))?;
        if request.status != FriendRequestStatus::Pending {
            return Err(DomainError::conflict("this friend request was already answered"));
        }
        Ok(request)
    }

    async fn with_profiles(
        &self,
        requests: Vec<FriendRequest>,
        other: impl Fn(&FriendRequest) -> Uuid,
    ) -> DomainResult<Vec<FriendRequestView>> {
        let by_id = self.profiles(requests.iter().map(&other).collect()).await?;
        Ok(requests
            .into_iter()
            .map(|request| {
                let user = by_id.get(&other(&request)).cloned();
                FriendRequestView { request, user }
            })
            .collect())
    }

    async fn profiles(&self, ids: Vec<Uuid>) -> DomainResult<HashMap<Uuid, UserProfile>> {
        let users: Vec<User> = self.users.find_many(ids).await?;
        Ok(users.iter().map(|u| (u.id, UserProfile::public(u))).collect())
    }

    async fn display_name(&self, id: Uuid) -> String {
        match self.users.find_by_id(id).await {
            Ok(Some(user)) => user.display_name,
            _ => "Someone".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use domains::{NotificationFilter, Page, Role};

    #[tokio::test]
    async fn request_cannot_be_sent_twice_in_either_direction() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let ben = h.user("ben", Role::Player).await;

        h.services.social.send_request(&kate, ben.id, Some("Good game!".into())).await.unwrap();
        let again = h.services.social.send_request(&kate, ben.id, None).await;
        assert!(matches!(again, Err(DomainError::Conflict(_))));
        let reverse = h.services.social.send_request(&ben, kate.id, None).await;
        assert!(matches!(reverse, Err(DomainError::Conflict(_))));
        let me = h.services.social.send_request(&kate, kate.id, None).await;
        assert!(matches!(me, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn accept_creates_friendship_and_blocks_new_requests() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let ben = h.user("ben", Role::Player).await;
        let request = h.services.social.send_request(&kate, ben.id, None).await.unwrap();

        let incoming = h.services.social.incoming(&ben).await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].user.as_ref().unwrap().id, kate.id);

        let not_mine = h.services.social.respond(&kate, request.id, true).await;
        assert!(matches!(not_mine, Err(DomainError::Forbidden(_))));

        let friendship = h.services.social.respond(&ben, request.id, true).await.unwrap();
        assert!(friendship.unwrap().involves(kate.id));
        assert_eq!(h.services.social.list_friends(&kate).await.unwrap()[0].id, ben.id);

        let notes = h.services.notifications.list(&kate, NotificationFilter::default(), Page::default()).await.unwrap();
        assert!(notes.iter().any(|n| n.kind == NotificationKind::FriendAccepted));

        let to_friend = h.services.social.send_request(&ben, kate.id, None).await;
        assert!(matches!(to_friend, Err(DomainError::Conflict(_))));
        assert!(h.services.social.outgoing(&kate).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn declined_request_can_be_resent() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let ben = h.user("ben", Role::Player).await;
        let request = h.services.social.send_request(&kate, ben.id, None).await.unwrap();
        assert!(h.services.social.respond(&ben, request.id, false).await.unwrap().is_none());
        h.services.social.send_request(&kate, ben.id, None).await.unwrap();
    }

    #[tokio::test]
    async fn removing_a_friend_allows_a_fresh_request() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let ben = h.user("ben", Role::Player).await;
        let request = h.services.social.send_request(&kate, ben.id, None).await.unwrap();
        h.services.social.respond(&ben, request.id, true).await.unwrap();

        h.services.social.remove_friend(&ben, kate.id).await.unwrap();
        assert!(h.services.social.list_friends(&kate).await.unwrap().is_empty());
        let missing = h.services.social.remove_friend(&ben, kate.id).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
        h.services.social.send_request(&kate, ben.id, None).await.unwrap();
    }

    #[tokio::test]
    async fn recipient_preferences_and_cancel() {
        let h = Harness::new();
        let kate = h.user("kate", Role::Player).await;
        let hermit = h.user("hermit", Role::Player).await;
        let mut user = h.load(hermit.id).await;
        user.preferences.allow_friend_requests = false;
        h.ports.users.update(user).await.unwrap();
        let blocked = h.services.social.send_request(&kate, hermit.id, None).await;
        assert!(matches!(blocked, Err(DomainError::Forbidden(_))));

        let ben = h.user("ben", Role::Player).await;
        let request = h.services.social.send_request(&kate, ben.id, None).await.unwrap();
        let not_sender = h.services.social.cancel_request(&ben, request.id).await;
        assert!(matches!(not_sender, Err(DomainError::Forbidden(_))));
        h.services.social.cancel_request(&kate, request.id).await.unwrap();
        assert!(h.services.social.incoming(&ben).await.unwrap().is_empty());
    }
}
