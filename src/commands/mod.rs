pub mod interaction;
pub mod link;

pub use interaction::{AllowedMentions, CommandInvocation, Interaction, InteractionResponse};
pub use link::LinkCommandHandler;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::messages;

/// Route an authenticated interaction to its handler
pub async fn dispatch_interaction(
    interaction: Interaction,
    link_handler: &LinkCommandHandler,
) -> Result<InteractionResponse> {
    match interaction {
        Interaction::Ping => {
            debug!("Interaction ping");
            Ok(InteractionResponse::pong())
        }
        Interaction::ApplicationCommand(invocation) => {
            info!(
                "Command '{}' invoked by {}",
                invocation.name, invocation.invoking_user_id
            );
            match invocation.name.as_str() {
                link::LINK_COMMAND => link_handler.handle(&invocation).await,
                other => {
                    warn!("Unknown command '{}'", other);
                    Ok(InteractionResponse::ephemeral(
                        messages::unsupported_command_message(other),
                    ))
                }
            }
        }
        Interaction::Unsupported { kind } => {
            warn!("Unsupported interaction type {}", kind);
            Ok(InteractionResponse::ephemeral(
                messages::unsupported_interaction_message(),
            ))
        }
    }
}
