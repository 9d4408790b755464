//! Authorization Guard
//! Mission: Role, ownership, and scope policies as pure predicate checks
//!
//! Every decision is a function of (account, resource) at call time; no
//! state is retained between calls. Denials carry the human-readable
//! reason surfaced in the 403 body.

use crate::auth::models::User;
use crate::errors::ApiError;
use crate::store::models::{Reservation, Room, OPEN_FACULTY};

/// Reservation actions with distinct denial messages.
#[derive(Debug, Clone, Copy)]
pub enum ReservationAction {
    Update,
    Delete,
}

/// Role policy: room and table management require the admin role plus the
/// explicit room-management capability flag.
pub fn ensure_room_manager(user: &User) -> Result<(), ApiError> {
    if user.can_manage_rooms() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions".to_string()))
    }
}

/// Ownership policy: mutating a room is reserved for the account that
/// created it. Other admins are denied too.
pub fn ensure_room_owner(user: &User, room: &Room) -> Result<(), ApiError> {
    if room.user_id == user.id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You are not the owner of this room".to_string(),
        ))
    }
}

/// Scope policy for reservation creation, including the closed-room edge
/// case. The closed check comes first: a closed room rejects everyone.
pub fn ensure_reservable(user: &User, room: &Room) -> Result<(), ApiError> {
    if !room.is_open {
        return Err(ApiError::Forbidden("This room is closed".to_string()));
    }
    if room.faculty != user.faculty && room.faculty != OPEN_FACULTY {
        return Err(ApiError::Forbidden(
            "You can only reserve tables in your faculty's rooms".to_string(),
        ));
    }
    Ok(())
}

/// Ownership policy for reservations: the reserving account or any admin.
pub fn ensure_reservation_owner(
    user: &User,
    reservation: &Reservation,
    action: ReservationAction,
) -> Result<(), ApiError> {
    if reservation.user_id == user.id || user.is_admin() {
        return Ok(());
    }
    let reason = match action {
        ReservationAction::Update => "You are not allowed to update this reservation",
        ReservationAction::Delete => "You are not allowed to delete this reservation",
    };
    Err(ApiError::Forbidden(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use chrono::Utc;

    fn user(id: i64, role: Role, room_permission: bool, faculty: &str) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@test.com", id),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: String::new(),
            role,
            room_permission,
            faculty: faculty.to_string(),
            register_date: Utc::now(),
            updated_date: Utc::now(),
            last_login_date: None,
        }
    }

    fn room(user_id: i64, faculty: &str, is_open: bool) -> Room {
        Room {
            id: 1,
            name: "Reading Room".to_string(),
            faculty: faculty.to_string(),
            is_open,
            user_id,
        }
    }

    fn reservation(user_id: i64) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: 1,
            user_id,
            table_id: 1,
            duration_hours: 2,
            reserved_at: now,
            start_time: now,
            end_time: now + chrono::Duration::hours(2),
        }
    }

    fn forbidden_reason(result: Result<(), ApiError>) -> String {
        match result {
            Err(ApiError::Forbidden(reason)) => reason,
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_room_manager_policy() {
        let admin = user(1, Role::Admin, true, "Engineering");
        assert!(ensure_room_manager(&admin).is_ok());

        // Plain user
        let plain = user(2, Role::User, false, "Engineering");
        assert_eq!(
            forbidden_reason(ensure_room_manager(&plain)),
            "Not enough permissions"
        );

        // Admin without the capability flag
        let unflagged = user(3, Role::Admin, false, "Engineering");
        assert!(ensure_room_manager(&unflagged).is_err());

        // Capability flag without the role
        let flagged_user = user(4, Role::User, true, "Engineering");
        assert!(ensure_room_manager(&flagged_user).is_err());
    }

    #[test]
    fn test_room_ownership_denies_other_admins() {
        let owner = user(1, Role::Admin, true, "Engineering");
        let other_admin = user(2, Role::Admin, true, "Engineering");
        let their_room = room(1, "Engineering", true);

        assert!(ensure_room_owner(&owner, &their_room).is_ok());
        assert_eq!(
            forbidden_reason(ensure_room_owner(&other_admin, &their_room)),
            "You are not the owner of this room"
        );
    }

    #[test]
    fn test_faculty_scope() {
        let engineering = user(1, Role::User, false, "Engineering");
        let business = user(2, Role::User, false, "Business");
        let eng_room = room(9, "Engineering", true);

        assert!(ensure_reservable(&engineering, &eng_room).is_ok());
        assert_eq!(
            forbidden_reason(ensure_reservable(&business, &eng_room)),
            "You can only reserve tables in your faculty's rooms"
        );

        // Open-to-all rooms bypass the faculty check
        let open_room = room(9, OPEN_FACULTY, true);
        assert!(ensure_reservable(&business, &open_room).is_ok());
    }

    #[test]
    fn test_closed_room_rejects_everyone() {
        let matching = user(1, Role::User, false, "Engineering");
        let closed = room(1, "Engineering", false);

        // Closed wins even when scope and ownership would pass
        assert_eq!(
            forbidden_reason(ensure_reservable(&matching, &closed)),
            "This room is closed"
        );
    }

    #[test]
    fn test_reservation_ownership() {
        let owner = user(1, Role::User, false, "Engineering");
        let stranger = user(2, Role::User, false, "Engineering");
        let admin = user(3, Role::Admin, false, "Engineering");
        let theirs = reservation(1);

        assert!(ensure_reservation_owner(&owner, &theirs, ReservationAction::Update).is_ok());
        assert!(ensure_reservation_owner(&admin, &theirs, ReservationAction::Delete).is_ok());

        assert_eq!(
            forbidden_reason(ensure_reservation_owner(
                &stranger,
                &theirs,
                ReservationAction::Update
            )),
            "You are not allowed to update this reservation"
        );
        assert_eq!(
            forbidden_reason(ensure_reservation_owner(
                &stranger,
                &theirs,
                ReservationAction::Delete
            )),
            "You are not allowed to delete this reservation"
        );
    }
}
