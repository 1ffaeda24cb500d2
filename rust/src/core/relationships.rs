// Friends, incoming friend requests, and requests we sent that are still in flight.

use std::collections::BTreeSet;

use crate::error::{CoreError, CoreResult};
use crate::state::{matches_query, Friend, FriendRequest, UserProfile};

#[derive(Debug, Default)]
pub(crate) struct RelationshipStore {
    friends: Vec<Friend>,
    requests: Vec<FriendRequest>,
    // Participant ids we asked to be friends with.
    outgoing: BTreeSet<String>,
}

impl RelationshipStore {
    pub(crate) fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub(crate) fn requests(&self) -> &[FriendRequest] {
        &self.requests
    }

    pub(crate) fn friend(&self, friend_id: &str) -> CoreResult<&Friend> {
        self.friends
            .iter()
            .find(|f| f.id() == friend_id)
            .ok_or_else(|| CoreError::not_found("friend", friend_id))
    }

    pub(crate) fn is_friend(&self, id: &str) -> bool {
        self.friends.iter().any(|f| f.id() == id)
    }

    pub(crate) fn has_outgoing(&self, participant_id: &str) -> bool {
        self.outgoing.contains(participant_id)
    }

    /// Records an outgoing request. Sending again to the same person, or to someone who is
    /// already a friend, is `Unchanged`.
    pub(crate) fn send_friend_request(&mut self, participant_id: &str) -> CoreResult<()> {
        if self.is_friend(participant_id) {
            return Err(CoreError::Unchanged);
        }
        if !self.outgoing.insert(participant_id.to_string()) {
            return Err(CoreError::Unchanged);
        }
        Ok(())
    }

    /// Adds an incoming request. At most one pending request per sender is kept.
    pub(crate) fn receive_friend_request(&mut self, request: FriendRequest) -> CoreResult<()> {
        let from = request.from.id();
        if self.is_friend(from) {
            return Err(CoreError::Unchanged);
        }
        if self
            .requests
            .iter()
            .any(|r| r.id == request.id || r.from.id() == from)
        {
            return Err(CoreError::Unchanged);
        }
        self.requests.push(request);
        Ok(())
    }

    pub(crate) fn accept_friend_request(&mut self, request_id: &str) -> CoreResult<Friend> {
        let idx = self
            .requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(|| CoreError::not_found("friend request", request_id))?;
        let request = self.requests.remove(idx);
        // Accepting means we are talking right now.
        let friend = Friend {
            is_online: true,
            last_seen: None,
            ..request.from
        };
        Ok(self.add_friend(friend))
    }

    pub(crate) fn decline_friend_request(&mut self, request_id: &str) -> CoreResult<FriendRequest> {
        let idx = self
            .requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(|| CoreError::not_found("friend request", request_id))?;
        Ok(self.requests.remove(idx))
    }

    /// The other side accepted a request we sent.
    pub(crate) fn outgoing_accepted(&mut self, participant: UserProfile) -> CoreResult<Friend> {
        if !self.outgoing.contains(&participant.id) {
            return Err(CoreError::not_found("outgoing friend request", participant.id));
        }
        Ok(self.add_friend(Friend {
            profile: participant,
            is_online: true,
            last_seen: None,
        }))
    }

    fn add_friend(&mut self, friend: Friend) -> Friend {
        let id = friend.id().to_string();
        self.outgoing.remove(&id);
        self.requests.retain(|r| r.from.id() != id);
        match self.friends.iter_mut().find(|f| f.id() == id) {
            Some(existing) => {
                *existing = friend.clone();
            }
            None => self.friends.push(friend.clone()),
        }
        friend
    }

    pub(crate) fn unfriend(&mut self, friend_id: &str) -> CoreResult<Friend> {
        let idx = self
            .friends
            .iter()
            .position(|f| f.id() == friend_id)
            .ok_or_else(|| CoreError::not_found("friend", friend_id))?;
        Ok(self.friends.remove(idx))
    }

    pub(crate) fn set_presence(
        &mut self,
        friend_id: &str,
        is_online: bool,
        now: i64,
    ) -> CoreResult<()> {
        let friend = self
            .friends
            .iter_mut()
            .find(|f| f.id() == friend_id)
            .ok_or_else(|| CoreError::not_found("friend", friend_id))?;
        if friend.is_online == is_online {
            return Err(CoreError::Unchanged);
        }
        friend.is_online = is_online;
        if !is_online {
            friend.last_seen = Some(now);
        }
        Ok(())
    }

    /// Every friend, split into (online, offline).
    pub(crate) fn partition(&self) -> (Vec<Friend>, Vec<Friend>) {
        self.friends.iter().cloned().partition(|f| f.is_online)
    }

    /// Friends whose name or bio contains `query`.
    pub(crate) fn search(&self, query: &str) -> Vec<Friend> {
        self.friends
            .iter()
            .filter(|f| {
                matches_query(&[f.profile.name.as_str(), f.profile.bio.as_str()], query)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Region;

    fn profile(id: &str, name: &str, bio: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: name.to_string(),
            avatar: "🐙".to_string(),
            avatar_color: "from-emerald-400 to-teal-500".to_string(),
            bio: bio.to_string(),
            region: Region::Asia,
            gender: None,
            joined_date: 0,
        }
    }

    fn request(id: &str, from_id: &str, name: &str) -> FriendRequest {
        FriendRequest {
            id: id.to_string(),
            from: Friend {
                profile: profile(from_id, name, ""),
                is_online: false,
                last_seen: Some(5),
            },
            received_at: 100,
        }
    }

    #[test]
    fn accepting_a_request_adds_exactly_one_friend() {
        let mut store = RelationshipStore::default();
        store
            .receive_friend_request(request("r1", "u9", "Sam"))
            .unwrap();

        let friend = store.accept_friend_request("r1").unwrap();
        assert_eq!(friend.profile.id, "u9");
        assert_eq!(friend.profile.name, "Sam");
        assert!(friend.is_online);

        assert_eq!(store.friends().len(), 1);
        assert_eq!(store.friends()[0].profile.id, "u9");
        assert!(store.requests().iter().all(|r| r.id != "r1"));
        assert!(matches!(
            store.accept_friend_request("r1"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn declining_a_request_adds_no_friend() {
        let mut store = RelationshipStore::default();
        store
            .receive_friend_request(request("r1", "u9", "Sam"))
            .unwrap();
        let declined = store.decline_friend_request("r1").unwrap();
        assert_eq!(declined.id, "r1");
        assert!(store.requests().is_empty());
        assert!(store.friends().is_empty());
    }

    #[test]
    fn one_pending_request_per_sender() {
        let mut store = RelationshipStore::default();
        store
            .receive_friend_request(request("r1", "u9", "Sam"))
            .unwrap();
        assert_eq!(
            store.receive_friend_request(request("r2", "u9", "Sam")),
            Err(CoreError::Unchanged)
        );
        assert_eq!(store.requests().len(), 1);
    }

    #[test]
    fn requests_from_friends_are_ignored() {
        let mut store = RelationshipStore::default();
        store
            .receive_friend_request(request("r1", "u9", "Sam"))
            .unwrap();
        store.accept_friend_request("r1").unwrap();
        assert_eq!(
            store.receive_friend_request(request("r2", "u9", "Sam")),
            Err(CoreError::Unchanged)
        );
    }

    #[test]
    fn sending_a_request_twice_is_unchanged() {
        let mut store = RelationshipStore::default();
        store.send_friend_request("u1").unwrap();
        assert!(store.has_outgoing("u1"));
        assert_eq!(store.send_friend_request("u1"), Err(CoreError::Unchanged));
    }

    #[test]
    fn outgoing_acceptance_needs_a_sent_request() {
        let mut store = RelationshipStore::default();
        assert!(store
            .outgoing_accepted(profile("u1", "Ana", ""))
            .is_err());

        store.send_friend_request("u1").unwrap();
        let friend = store.outgoing_accepted(profile("u1", "Ana", "")).unwrap();
        assert!(friend.is_online);
        assert!(store.is_friend("u1"));
        assert!(!store.has_outgoing("u1"));
        assert_eq!(store.send_friend_request("u1"), Err(CoreError::Unchanged));
    }

    #[test]
    fn accepting_clears_the_matching_outgoing_request() {
        let mut store = RelationshipStore::default();
        store.send_friend_request("u9").unwrap();
        store
            .receive_friend_request(request("r1", "u9", "Sam"))
            .unwrap();
        store.accept_friend_request("r1").unwrap();
        assert!(!store.has_outgoing("u9"));
    }

    #[test]
    fn online_and_offline_partition_the_friend_list() {
        let mut store = RelationshipStore::default();
        for (i, name) in ["Ana", "Ben", "Cy", "Dee"].iter().enumerate() {
            let id = format!("u{i}");
            store.send_friend_request(&id).unwrap();
            store.outgoing_accepted(profile(&id, name, "")).unwrap();
        }
        store.set_presence("u1", false, 50).unwrap();
        store.set_presence("u3", false, 60).unwrap();

        let (online, offline) = store.partition();
        assert_eq!(online.len() + offline.len(), store.friends().len());
        for f in store.friends() {
            let in_online = online.iter().any(|o| o.id() == f.id());
            let in_offline = offline.iter().any(|o| o.id() == f.id());
            assert!(in_online ^ in_offline, "{} must be in exactly one view", f.id());
        }
        assert_eq!(
            offline.iter().map(|f| f.last_seen).collect::<Vec<_>>(),
            vec![Some(50), Some(60)]
        );
    }

    #[test]
    fn presence_change_to_same_value_is_unchanged() {
        let mut store = RelationshipStore::default();
        store.send_friend_request("u1").unwrap();
        store.outgoing_accepted(profile("u1", "Ana", "")).unwrap();
        assert_eq!(store.set_presence("u1", true, 1), Err(CoreError::Unchanged));
        assert!(store.set_presence("nobody", false, 1).is_err());
    }

    #[test]
    fn search_matches_name_or_bio_case_insensitively() {
        let mut store = RelationshipStore::default();
        for (id, name, bio) in [
            ("u1", "Samira", "night owl"),
            ("u2", "Leo", "Loves SAMBA"),
            ("u3", "Kim", "coffee"),
        ] {
            store.send_friend_request(id).unwrap();
            store.outgoing_accepted(profile(id, name, bio)).unwrap();
        }
        let ids: Vec<_> = store.search("sam").into_iter().map(|f| f.profile.id).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(store.search("").len(), 3);

        // Search never narrows the presence views.
        let (online, offline) = store.partition();
        assert_eq!(online.len() + offline.len(), 3);
    }

    #[test]
    fn unfriend_removes_only_that_friend() {
        let mut store = RelationshipStore::default();
        for id in ["u1", "u2"] {
            store.send_friend_request(id).unwrap();
            store.outgoing_accepted(profile(id, id, "")).unwrap();
        }
        let removed = store.unfriend("u1").unwrap();
        assert_eq!(removed.id(), "u1");
        assert!(!store.is_friend("u1"));
        assert!(store.is_friend("u2"));
        assert!(store.unfriend("u1").is_err());
    }
}
