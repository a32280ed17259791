//! Simulated ticketing system.

use std::sync::Arc;

use choreo_core::collaborator::{CollabFuture, Ticketing};
use choreo_types::collaborator::{Capability, TicketCreated};
use choreo_types::incident::Incident;

use super::SimState;

const TICKET_BASE_URL: &str = "https://tickets.example.com/incident";

pub struct SimulatedTicketing {
    state: Arc<SimState>,
}

impl SimulatedTicketing {
    pub(crate) fn new(state: Arc<SimState>) -> Self {
        Self { state }
    }
}

impl Ticketing for SimulatedTicketing {
    fn create<'a>(&'a self, incident: &'a Incident) -> CollabFuture<'a, TicketCreated> {
        Box::pin(async move {
            let detail = format!("{} [{}]", incident.title, incident.severity.priority());
            let n = self.state.enter(Capability::Ticketing, "create", detail).await?;
            let external_id = format!("INC{n:07}");
            Ok(TicketCreated {
                link: format!("{TICKET_BASE_URL}/{external_id}"),
                external_id,
            })
        })
    }

    fn add_note<'a>(&'a self, external_id: &'a str, text: &'a str) -> CollabFuture<'a, ()> {
        Box::pin(async move {
            self.state
                .enter(Capability::Ticketing, "add_note", format!("{external_id}: {text}"))
                .await?;
            Ok(())
        })
    }
}
