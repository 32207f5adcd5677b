//! Who may change what.
//!
//! Blog update/delete is owner-or-admin. Comment deletion also lets the
//! blog's author moderate comments on their own post.

use uuid::Uuid;

use crate::auth::{extractors::Actor, repo_types::Role};

pub fn can_mutate(actor: &Actor, owner_id: Uuid) -> bool {
    actor.id == owner_id || actor.role == Role::Admin
}

pub fn can_delete_comment(actor: &Actor, comment_owner_id: Uuid, blog_owner_id: Uuid) -> bool {
    actor.id == comment_owner_id || actor.id == blog_owner_id || actor.role == Role::Admin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn owner_or_admin_may_mutate() {
        let owner = user(Role::User);
        assert!(can_mutate(&owner, owner.id));
        assert!(can_mutate(&user(Role::Admin), owner.id));
        assert!(!can_mutate(&user(Role::User), owner.id));
    }

    #[test]
    fn comment_deletion_is_three_way() {
        let commenter = user(Role::User);
        let blog_owner = user(Role::User);
        let stranger = user(Role::User);
        let admin = user(Role::Admin);

        assert!(can_delete_comment(&commenter, commenter.id, blog_owner.id));
        assert!(can_delete_comment(&blog_owner, commenter.id, blog_owner.id));
        assert!(can_delete_comment(&admin, commenter.id, blog_owner.id));
        assert!(!can_delete_comment(&stranger, commenter.id, blog_owner.id));
    }

    #[test]
    fn blog_mutation_does_not_extend_to_commenters() {
        // The comment author gets no rights over the blog itself.
        let commenter = user(Role::User);
        let blog_owner = Uuid::new_v4();
        assert!(!can_mutate(&commenter, blog_owner));
    }
}
