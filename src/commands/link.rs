use tracing::{info, warn};

use super::interaction::{CommandInvocation, InteractionResponse};
use crate::error::Result;
use crate::messages;
use crate::models::MAX_PLAYER_NAME_LEN;
use crate::state::IdentityStore;

pub const LINK_COMMAND: &str = "link";
pub const PLAYER_NAME_OPTION: &str = "playername";

/// Handles `/link playername:<name>`
#[derive(Clone)]
pub struct LinkCommandHandler {
    store: IdentityStore,
}

impl LinkCommandHandler {
    pub fn new(store: IdentityStore) -> Self {
        Self { store }
    }

    /// Link the invoking user to the given player name.
    ///
    /// Bad input gets an ephemeral usage reply. Only a failing store is an error.
    pub async fn handle(&self, invocation: &CommandInvocation) -> Result<InteractionResponse> {
        let player_name = match invocation.string_option(PLAYER_NAME_OPTION) {
            Some(name) => name,
            None => {
                warn!(
                    "/link from {} without a '{}' option",
                    invocation.invoking_user_id, PLAYER_NAME_OPTION
                );
                return Ok(InteractionResponse::ephemeral(messages::link_usage_message()));
            }
        };

        let length = player_name.trim().chars().count();
        if length == 0 || length > MAX_PLAYER_NAME_LEN {
            warn!(
                "/link from {} rejected: player name length {}",
                invocation.invoking_user_id, length
            );
            return Ok(InteractionResponse::ephemeral(
                messages::link_invalid_name_message(MAX_PLAYER_NAME_LEN),
            ));
        }

        let link = self
            .store
            .put(player_name, &invocation.invoking_user_id)
            .await?;
        info!(
            "User {} linked player name '{}'",
            link.discord_user_id, link.normalized_name
        );

        Ok(InteractionResponse::ephemeral(messages::link_success_message(
            &link.normalized_name,
            &link.discord_user_id,
        )))
    }
}
