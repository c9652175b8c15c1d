use nova_flow::{AnchorId, ValueFactory, VarId, VariableDescriptor};
use nova_jdwp::{signature_to_type_name, FrameRef, JdwpClient, JdwpValue, Location};

use crate::error::{DfaAssistError, DfaAssistResult};
use crate::host::CodeBlockId;
use crate::listener::{ConstantConditionListener, DebuggerDfaListener};
use crate::provider::{DfaAssistProvider, LanguageId, SourceElement};

/// Java source mapping: locals by name, `this`, and instance fields reached
/// through either.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaDfaAssistProvider;

impl JavaDfaAssistProvider {
    fn resolve(
        &self,
        client: &mut dyn JdwpClient,
        frame: FrameRef,
        factory: &ValueFactory,
        var: VarId,
    ) -> DfaAssistResult<Option<JdwpValue>> {
        match &factory.data(var).descriptor {
            VariableDescriptor::Local(name) => Ok(client.local_value(frame, name)?),
            VariableDescriptor::This => Ok(client.this_object(frame)?.map(JdwpValue::Object)),
            VariableDescriptor::Field { qualifier, name } => {
                let Some(JdwpValue::Object(object)) =
                    self.resolve(client, frame, factory, *qualifier)?
                else {
                    return Ok(None);
                };
                match client.read_field(object.id, name) {
                    Ok(value) => Ok(value),
                    Err(err) if err.is_object_collected() => Ok(None),
                    Err(err) => Err(err.into()),
                }
            }
            // Derived from the qualifier's snapshot instead.
            VariableDescriptor::Special { .. } => Ok(None),
            // Resolved from the assertion status by the caller.
            VariableDescriptor::AssertionsDisabled => Ok(None),
        }
    }
}

impl DfaAssistProvider for JavaDfaAssistProvider {
    fn language(&self) -> LanguageId {
        LanguageId::JAVA
    }

    fn location_matches(
        &self,
        element: &SourceElement,
        location: &Location,
    ) -> DfaAssistResult<bool> {
        let signature = location.class_signature.as_str();
        if !(signature.starts_with('L') && signature.ends_with(';') && signature.len() > 2) {
            return Err(DfaAssistError::InvalidLocation(format!(
                "declaring type signature `{signature}` is not a class"
            )));
        }
        if location.line != element.line {
            return Ok(false);
        }
        // Lambdas, local and anonymous classes compile to nested binary names.
        let type_name = signature_to_type_name(signature);
        Ok(type_name == element.enclosing_class
            || type_name
                .strip_prefix(element.enclosing_class.as_str())
                .is_some_and(|rest| rest.starts_with('$')))
    }

    fn anchor(&self, element: &SourceElement) -> Option<AnchorId> {
        element.anchor
    }

    fn code_block(&self, _anchor: AnchorId, element: &SourceElement) -> Option<CodeBlockId> {
        element.code_block
    }

    fn live_value(
        &self,
        client: &mut dyn JdwpClient,
        frame: FrameRef,
        factory: &ValueFactory,
        var: VarId,
        _anchor: AnchorId,
    ) -> DfaAssistResult<Option<JdwpValue>> {
        self.resolve(client, frame, factory, var)
    }

    fn create_listener(&self) -> Box<dyn DebuggerDfaListener> {
        Box::new(ConstantConditionListener::default())
    }
}
