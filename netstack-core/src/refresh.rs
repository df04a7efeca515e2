//! Refresh - Reconcile recorded states with the cloud before planning

use crate::provider::{Provider, ProviderResult};
use crate::resource::State;

/// Re-read every recorded resource that has a cloud identifier.
///
/// Resources the provider no longer finds are dropped, so the next plan
/// creates them again instead of updating or deleting something that is
/// gone. Recorded attributes take precedence over read ones; read outputs
/// only fill in attributes the record lacks.
pub async fn refresh_states<P: Provider + ?Sized>(
    provider: &P,
    recorded: &[State],
) -> ProviderResult<Vec<State>> {
    let mut refreshed = Vec::with_capacity(recorded.len());

    for state in recorded.iter().filter(|s| s.exists) {
        let Some(identifier) = state.identifier.as_deref() else {
            refreshed.push(state.clone());
            continue;
        };

        let current = provider
            .read(&state.id, identifier)
            .await
            .map_err(|e| e.for_resource(state.id.clone()))?;
        if !current.exists {
            log::warn!(
                "{} ({}) no longer exists in {}, dropping it from state",
                state.id,
                identifier,
                provider.name()
            );
            continue;
        }

        let mut state = state.clone();
        for (key, value) in current.attributes {
            state.attributes.entry(key).or_insert(value);
        }
        refreshed.push(state);
    }

    Ok(refreshed)
}
