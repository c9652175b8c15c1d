use indexmap::IndexMap;
use nova_flow::{AnchorId, ValueFactory, VarId, VariableDescriptor};
use nova_jdwp::{FrameRef, JdwpClient, JdwpValue};

use crate::error::DfaAssistResult;
use crate::provider::DfaAssistProvider;

/// Analysis variables grouped by the live value they hold, in first-seen order.
pub type AliasMap = IndexMap<JdwpValue, Vec<VarId>>;

/// Resolves every variable of `factory` in the paused `frame`.
///
/// Unresolvable variables are left out; an empty map means nothing could be
/// seeded.
pub fn resolve_live_values(
    provider: &dyn DfaAssistProvider,
    client: &mut dyn JdwpClient,
    frame: FrameRef,
    factory: &ValueFactory,
    anchor: AnchorId,
) -> DfaAssistResult<AliasMap> {
    let mut aliases = AliasMap::new();
    for var in factory.variables() {
        let value = match factory.data(var).descriptor {
            VariableDescriptor::AssertionsDisabled => Some(assertions_disabled(client, frame)?),
            _ => provider.live_value(client, frame, factory, var, anchor)?,
        };
        match value {
            Some(JdwpValue::Void) | None => {
                tracing::trace!(var = var.index(), "no live value");
            }
            Some(value) => aliases.entry(value).or_default().push(var),
        }
    }
    Ok(aliases)
}

/// Live value of the synthetic `$assertionsDisabled` flag.
///
/// An indeterminate status counts as "assertions enabled".
fn assertions_disabled(client: &mut dyn JdwpClient, frame: FrameRef) -> DfaAssistResult<JdwpValue> {
    let location = client.location(frame)?;
    let status = client.effective_assertion_status(&location)?;
    Ok(client.mirror_of_bool(status == Some(false)))
}
