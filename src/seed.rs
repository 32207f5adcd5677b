use axum::extract::FromRef;
use tracing::{info, instrument};

use crate::{
    auth::{extractors::Actor, repo_types::Role, services::UserDirectory},
    blogs::{
        model::{BlogDraft, Tags},
        services::BlogStore,
    },
    state::AppState,
};

fn welcome_post() -> BlogDraft {
    BlogDraft {
        title: "Welcome to the blog".into(),
        description: "This is the first default post.".into(),
        tags: Tags::from_list(["welcome", "first"]),
    }
}

/// Creates the default admin and a welcome post on an empty store.
/// Does nothing once any blog exists.
#[instrument(skip_all)]
pub async fn seed_defaults(state: &AppState) -> anyhow::Result<()> {
    let seed = &state.config.seed;
    if !seed.enabled {
        return Ok(());
    }
    if state.blogs.count_blogs().await? > 0 {
        return Ok(());
    }

    let author = match state.users.first().await? {
        Some(user) => user,
        None => {
            let user = UserDirectory::from_ref(state)
                .register_with_role(&seed.name, &seed.email, &seed.password, Role::Admin)
                .await?;
            info!(user_id = %user.id, email = %user.email, "default user created");
            user
        }
    };

    let actor = Actor {
        id: author.id,
        role: author.role,
    };
    let blog = BlogStore::from_ref(state)
        .create(&actor, welcome_post())
        .await?;
    info!(blog_id = %blog.id, author_id = %author.id, "default post created");
    Ok(())
}
