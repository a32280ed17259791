//! Simulated team chat.

use std::sync::Arc;

use choreo_core::collaborator::{Chat, CollabFuture};
use choreo_types::collaborator::{Capability, ChannelCreated, TeamAssembled, UpdateKind};
use choreo_types::error::CollaboratorError;
use choreo_types::incident::Incident;
use choreo_types::team::TeamMember;

use super::{slug, SimState};

const CHAT_BASE_URL: &str = "https://chat.example.com/archives";
const MAX_CHANNEL_NAME: usize = 80;

pub struct SimulatedChat {
    state: Arc<SimState>,
}

impl SimulatedChat {
    pub(crate) fn new(state: Arc<SimState>) -> Self {
        Self { state }
    }
}

/// `inc-<n>-<severity>-<title slug>`, capped at the usual channel name limit.
fn channel_name(n: u32, incident: &Incident) -> String {
    let mut name = format!("inc-{n}-{}-{}", incident.severity, slug(&incident.title, 40));
    name.truncate(MAX_CHANNEL_NAME);
    name.trim_end_matches('-').to_string()
}

impl Chat for SimulatedChat {
    fn create_channel<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, ChannelCreated> {
        Box::pin(async move {
            let n = self
                .state
                .enter(Capability::Chat, "create_channel", incident.title.as_str())
                .await?;
            let channel_id = format!("C{n:06}");
            Ok(ChannelCreated {
                channel_name: channel_name(n, incident),
                link: format!("{CHAT_BASE_URL}/{channel_id}"),
                channel_id,
            })
        })
    }

    fn notify<'a>(
        &'a self,
        channel: &'a str,
        message: &'a str,
        _incident: Option<&'a Incident>,
    ) -> CollabFuture<'a, ()> {
        Box::pin(async move {
            if channel.trim().is_empty() {
                return Err(CollaboratorError::NotFound("empty channel".to_string()));
            }
            let first_line = message.lines().next().unwrap_or_default();
            self.state
                .enter(Capability::Chat, "notify", format!("{channel}: {first_line}"))
                .await?;
            Ok(())
        })
    }

    fn assemble_team<'a>(
        &'a self,
        _incident: &'a Incident,
        members: &'a [TeamMember],
        channel: &'a str,
    ) -> CollabFuture<'a, TeamAssembled> {
        Box::pin(async move {
            let handles: Vec<&str> = members
                .iter()
                .map(|m| m.chat_handle.as_deref().unwrap_or(m.name.as_str()))
                .collect();
            self.state
                .enter(
                    Capability::Chat,
                    "assemble_team",
                    format!("{channel}: {}", handles.join(", ")),
                )
                .await?;
            Ok(TeamAssembled {
                assembled_count: members.len(),
            })
        })
    }

    fn post_update<'a>(
        &'a self,
        channel: &'a str,
        _incident: &'a Incident,
        kind: UpdateKind,
        details: &'a str,
    ) -> CollabFuture<'a, ()> {
        Box::pin(async move {
            let first_line = details.lines().next().unwrap_or_default();
            self.state
                .enter(
                    Capability::Chat,
                    "post_update",
                    format!("{channel} [{}]: {first_line}", kind.as_str()),
                )
                .await?;
            Ok(())
        })
    }
}
