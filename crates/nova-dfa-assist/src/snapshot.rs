//! Process-independent copies of live values.
//!
//! Snapshots are taken once per pause, without analysis read access, so the
//! state builder never has to talk to the debuggee.

use indexmap::IndexMap;
use nova_flow::{DfType, PrimitiveKind, PrimitiveValue, SpecialField};
use nova_jdwp::{
    FrameRef, JdwpClient, JdwpError, JdwpValue, ObjectId, ObjectRef, ReferenceTypeInfo,
    CLASS_LOADER_TYPE_NAME, STRING_SIGNATURE,
};
use tokio_util::sync::CancellationToken;

use crate::error::{DfaAssistError, DfaAssistResult};
use crate::resolve::AliasMap;

/// Collections whose element count lives in an `int size` field.
const SIZED_COLLECTIONS: &[&str] = &["java.util.ArrayList", "java.util.LinkedList"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSnapshot {
    /// A primitive or `null`.
    PrimitiveConstant(DfType),
    StringConstant(String),
    ObjectRef {
        signature: String,
    },
    EnumConstant {
        signature: String,
        name: String,
    },
    /// An object together with the value of one of its special fields.
    ObjectWithSpecialField {
        signature: String,
        field: SpecialField,
        value: Box<ValueSnapshot>,
    },
}

impl ValueSnapshot {
    /// Runtime type signature for object snapshots.
    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::ObjectRef { signature }
            | Self::EnumConstant { signature, .. }
            | Self::ObjectWithSpecialField { signature, .. } => Some(signature),
            Self::PrimitiveConstant(_) => None,
            Self::StringConstant(_) => Some(STRING_SIGNATURE),
        }
    }
}

pub type SnapshotMap = IndexMap<JdwpValue, ValueSnapshot>;

/// Decides whether a class loader is "the same" as the paused frame's loader:
/// the bootstrap loader, the frame's loader itself, or one of its parents.
///
/// The parent chain is read lazily, at most once.
#[derive(Debug)]
pub struct ClassLoaderFilter {
    frame_loader: Option<ObjectId>,
    parents: Option<Vec<ObjectId>>,
}

impl ClassLoaderFilter {
    pub fn new(frame_loader: Option<ObjectId>) -> Self {
        Self {
            frame_loader,
            parents: None,
        }
    }

    pub fn accepts(
        &mut self,
        client: &mut dyn JdwpClient,
        loader: Option<ObjectId>,
    ) -> Result<bool, JdwpError> {
        let Some(loader) = loader else {
            return Ok(true);
        };
        if Some(loader) == self.frame_loader {
            return Ok(true);
        }
        let parents = match self.parents.take() {
            Some(parents) => parents,
            None => parent_chain(client, self.frame_loader)?,
        };
        let accepted = parents.contains(&loader);
        self.parents = Some(parents);
        Ok(accepted)
    }
}

/// `loader` followed by its `ClassLoader.parent` ancestors.
fn parent_chain(
    client: &mut dyn JdwpClient,
    loader: Option<ObjectId>,
) -> Result<Vec<ObjectId>, JdwpError> {
    let Some(loader) = loader else {
        return Ok(Vec::new());
    };
    let loader_type = client.object_type(loader)?;
    let Some(root) = client.find_supertype(loader_type, CLASS_LOADER_TYPE_NAME)? else {
        return Ok(Vec::new());
    };
    let Some(parent_field) = client.field_by_name(root.id, "parent")? else {
        return Ok(Vec::new());
    };

    let mut chain = vec![loader];
    let mut current = loader;
    while let JdwpValue::Object(parent) = client.object_field_value(current, parent_field)? {
        if chain.contains(&parent.id) {
            break;
        }
        chain.push(parent.id);
        current = parent.id;
    }
    Ok(chain)
}

/// Snapshots every distinct live value of `aliases`.
///
/// Values that cannot be snapshotted safely (foreign class loader, collected
/// object) are left out. Any other JDWP failure aborts the batch.
pub fn fetch_snapshots(
    client: &mut dyn JdwpClient,
    frame: FrameRef,
    aliases: &AliasMap,
    cancel: &CancellationToken,
) -> DfaAssistResult<SnapshotMap> {
    let mut filter = ClassLoaderFilter::new(client.frame_class_loader(frame)?);
    let mut snapshots = SnapshotMap::with_capacity(aliases.len());
    for value in aliases.keys() {
        if cancel.is_cancelled() {
            return Err(DfaAssistError::Cancelled);
        }
        match classify(client, value, &mut filter) {
            Ok(Some(snapshot)) => {
                snapshots.insert(value.clone(), snapshot);
            }
            Ok(None) => tracing::trace!(?value, "no snapshot"),
            Err(err) if err.is_object_collected() => {
                tracing::debug!(?value, error = %err, "object collected while snapshotting");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(snapshots)
}

pub fn classify(
    client: &mut dyn JdwpClient,
    value: &JdwpValue,
    filter: &mut ClassLoaderFilter,
) -> Result<Option<ValueSnapshot>, JdwpError> {
    match value {
        JdwpValue::Null => Ok(Some(ValueSnapshot::PrimitiveConstant(DfType::null()))),
        JdwpValue::Void => Ok(None),
        JdwpValue::Object(object) => classify_object(client, object, filter),
        primitive => Ok(primitive_constant(primitive).map(ValueSnapshot::PrimitiveConstant)),
    }
}

fn primitive_constant(value: &JdwpValue) -> Option<DfType> {
    let (kind, value) = match *value {
        JdwpValue::Boolean(v) => return Some(DfType::boolean(v)),
        JdwpValue::Byte(v) => (PrimitiveKind::Byte, PrimitiveValue::Integral(v.into())),
        JdwpValue::Short(v) => (PrimitiveKind::Short, PrimitiveValue::Integral(v.into())),
        JdwpValue::Int(v) => (PrimitiveKind::Int, PrimitiveValue::Integral(v.into())),
        JdwpValue::Long(v) => (PrimitiveKind::Long, PrimitiveValue::Integral(v)),
        JdwpValue::Char(v) => (PrimitiveKind::Char, PrimitiveValue::Char(v)),
        JdwpValue::Float(v) => return Some(DfType::float(v)),
        JdwpValue::Double(v) => return Some(DfType::double(v)),
        JdwpValue::Null | JdwpValue::Void | JdwpValue::Object(_) => return None,
    };
    Some(DfType::primitive(kind, value))
}

fn classify_object(
    client: &mut dyn JdwpClient,
    object: &ObjectRef,
    filter: &mut ClassLoaderFilter,
) -> Result<Option<ValueSnapshot>, JdwpError> {
    let type_id = client.object_type(object.id)?;
    let info = client.reference_type(type_id)?;
    if !filter.accepts(client, info.class_loader)? {
        tracing::trace!(signature = %info.signature, "type defined by a foreign class loader");
        return Ok(None);
    }

    if info.signature == STRING_SIGNATURE {
        return Ok(Some(ValueSnapshot::StringConstant(
            client.string_value(object.id)?,
        )));
    }
    if info.signature.starts_with('[') {
        let length = client.array_length(object.id)?;
        return Ok(Some(with_special_field(
            info.signature,
            SpecialField::ArrayLength,
            DfType::int(length),
        )));
    }
    if let Some(enum_type) = declaring_enum(client, &info)? {
        return Ok(Some(match client.read_field(object.id, "name")? {
            Some(JdwpValue::Object(name)) => ValueSnapshot::EnumConstant {
                signature: enum_type.signature,
                name: client.string_value(name.id)?,
            },
            _ => ValueSnapshot::ObjectRef {
                signature: enum_type.signature,
            },
        }));
    }

    let type_name = info.type_name();
    if let Some(kind) = PrimitiveKind::from_box_class_name(&type_name) {
        let unboxed = client
            .read_field(object.id, "value")?
            .as_ref()
            .and_then(primitive_constant)
            .filter(|ty| matches!(ty, DfType::Primitive { kind: actual, .. } if *actual == kind));
        if let Some(unboxed) = unboxed {
            return Ok(Some(with_special_field(
                info.signature,
                SpecialField::Unbox,
                unboxed,
            )));
        }
    } else if SIZED_COLLECTIONS.contains(&type_name.as_str()) {
        if let Some(JdwpValue::Int(size)) = client.read_field(object.id, "size")? {
            return Ok(Some(with_special_field(
                info.signature,
                SpecialField::CollectionSize,
                DfType::int(size),
            )));
        }
    }

    Ok(Some(ValueSnapshot::ObjectRef {
        signature: info.signature,
    }))
}

/// The enum type of an enum constant. Constants with a body are instances of
/// an anonymous subclass of the enum.
fn declaring_enum(
    client: &mut dyn JdwpClient,
    info: &ReferenceTypeInfo,
) -> Result<Option<ReferenceTypeInfo>, JdwpError> {
    if info.is_enum {
        return Ok(Some(info.clone()));
    }
    let Some(superclass) = info.superclass else {
        return Ok(None);
    };
    let parent = client.reference_type(superclass)?;
    Ok(parent.is_enum.then_some(parent))
}

fn with_special_field(signature: String, field: SpecialField, value: DfType) -> ValueSnapshot {
    ValueSnapshot::ObjectWithSpecialField {
        signature,
        field,
        value: Box::new(ValueSnapshot::PrimitiveConstant(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_flow::{ClassTable, JvmType, ValueFactory};
    use nova_jdwp::{Location, MockFrame, MockJdwpClient};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const FRAME: FrameRef = FrameRef {
        thread: 1,
        frame: 0,
    };

    fn paused(client: &mut MockJdwpClient, loader: Option<ObjectId>) {
        client.set_frame(
            FRAME,
            MockFrame::new(Location {
                class_signature: "La/Main;".to_string(),
                method: "main".to_string(),
                line: 1,
                code_index: 0,
            })
            .with_class_loader(loader),
        );
    }

    fn snapshot_of(client: &mut MockJdwpClient, value: JdwpValue) -> Option<ValueSnapshot> {
        let loader = client.frame_class_loader(FRAME).unwrap();
        classify(client, &value, &mut ClassLoaderFilter::new(loader)).unwrap()
    }

    #[test]
    fn classifies_primitives_and_null() {
        let mut client = MockJdwpClient::new();
        paused(&mut client, None);
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Int(5)),
            Some(ValueSnapshot::PrimitiveConstant(DfType::int(5)))
        );
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Boolean(true)),
            Some(ValueSnapshot::PrimitiveConstant(DfType::boolean(true)))
        );
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Null),
            Some(ValueSnapshot::PrimitiveConstant(DfType::null()))
        );
        assert_eq!(snapshot_of(&mut client, JdwpValue::Void), None);
    }

    #[test]
    fn classifies_objects() {
        let mut client = MockJdwpClient::new();
        paused(&mut client, None);

        let text = client.new_string("hello");
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(text)),
            Some(ValueSnapshot::StringConstant("hello".to_string()))
        );

        let array = client.new_array("[I", 3);
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(array)),
            Some(with_special_field(
                "[I".to_string(),
                SpecialField::ArrayLength,
                DfType::int(3)
            ))
        );

        let color = client.define_enum("La/Color;", None);
        let red = client.new_enum_constant(color, "RED");
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(red)),
            Some(ValueSnapshot::EnumConstant {
                signature: "La/Color;".to_string(),
                name: "RED".to_string(),
            })
        );

        let integer = client.define_type("Ljava/lang/Integer;", None, None);
        let boxed = client.new_object(integer);
        client.set_field(boxed.id, "value", JdwpValue::Int(42));
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(boxed)),
            Some(with_special_field(
                "Ljava/lang/Integer;".to_string(),
                SpecialField::Unbox,
                DfType::int(42)
            ))
        );

        let list_type = client.define_type("Ljava/util/ArrayList;", None, None);
        let list = client.new_object(list_type);
        client.set_field(list.id, "size", JdwpValue::Int(2));
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(list)),
            Some(with_special_field(
                "Ljava/util/ArrayList;".to_string(),
                SpecialField::CollectionSize,
                DfType::int(2)
            ))
        );

        let point = client.define_type("La/Point;", None, None);
        let p = client.new_object(point);
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(p)),
            Some(ValueSnapshot::ObjectRef {
                signature: "La/Point;".to_string()
            })
        );
    }

    #[test]
    fn enum_constant_bodies_report_the_enum_type() {
        let mut client = MockJdwpClient::new();
        paused(&mut client, None);
        let op = client.define_enum("La/Op;", None);
        let plus_body = client.define_type("La/Op$1;", Some(op), None);
        let plus = client.new_object(plus_body);
        let name = client.new_string("PLUS");
        client.set_field(plus.id, "name", JdwpValue::Object(name));
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(plus)),
            Some(ValueSnapshot::EnumConstant {
                signature: "La/Op;".to_string(),
                name: "PLUS".to_string(),
            })
        );
    }

    #[test]
    fn parent_loaders_are_equivalent_to_the_frame_loader() {
        let mut client = MockJdwpClient::new();
        let platform = client.new_class_loader(None);
        let app = client.new_class_loader(Some(&platform));
        let plugin = client.new_class_loader(Some(&app));
        let unrelated = client.new_class_loader(None);
        paused(&mut client, Some(app.id));

        let mut filter = ClassLoaderFilter::new(Some(app.id));
        assert!(filter.accepts(&mut client, None).unwrap());
        assert!(filter.accepts(&mut client, Some(app.id)).unwrap());
        assert!(filter.accepts(&mut client, Some(platform.id)).unwrap());
        assert!(!filter.accepts(&mut client, Some(plugin.id)).unwrap());
        assert!(!filter.accepts(&mut client, Some(unrelated.id)).unwrap());

        let from_parent = client.define_type("La/Shared;", None, Some(platform.id));
        let from_unrelated = client.define_type("La/Foreign;", None, Some(unrelated.id));
        let shared = client.new_object(from_parent);
        let foreign = client.new_object(from_unrelated);
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(shared)),
            Some(ValueSnapshot::ObjectRef {
                signature: "La/Shared;".to_string()
            })
        );
        assert_eq!(snapshot_of(&mut client, JdwpValue::Object(foreign)), None);
    }

    #[test]
    fn transitive_parent_loaders_are_equivalent() {
        let mut client = MockJdwpClient::new();
        let platform = client.new_class_loader(None);
        let app = client.new_class_loader(Some(&platform));
        let plugin = client.new_class_loader(Some(&app));
        paused(&mut client, Some(plugin.id));

        let mut filter = ClassLoaderFilter::new(Some(plugin.id));
        assert!(filter.accepts(&mut client, Some(app.id)).unwrap());
        assert!(filter.accepts(&mut client, Some(platform.id)).unwrap());

        let from_grandparent = client.define_type("La/Platform;", None, Some(platform.id));
        let object = client.new_object(from_grandparent);
        assert_eq!(
            snapshot_of(&mut client, JdwpValue::Object(object)),
            Some(ValueSnapshot::ObjectRef {
                signature: "La/Platform;".to_string()
            })
        );
    }

    #[test]
    fn parent_chain_is_read_once() {
        let mut client = MockJdwpClient::new();
        let platform = client.new_class_loader(None);
        let app = client.new_class_loader(Some(&platform));
        let mut filter = ClassLoaderFilter::new(Some(app.id));

        assert!(filter.accepts(&mut client, Some(platform.id)).unwrap());
        let after_first = client.calls();
        assert!(filter.accepts(&mut client, Some(platform.id)).unwrap());
        assert!(!filter.accepts(&mut client, Some(12_345)).unwrap());
        assert_eq!(client.calls(), after_first);
    }

    fn aliases(values: impl IntoIterator<Item = JdwpValue>) -> AliasMap {
        let mut factory = ValueFactory::new(Arc::new(ClassTable::new()));
        let int = JvmType::Primitive(PrimitiveKind::Int);
        values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (value, vec![factory.local(&format!("v{idx}"), &int)]))
            .collect()
    }

    #[test]
    fn collected_objects_are_dropped() {
        let mut client = MockJdwpClient::new();
        paused(&mut client, None);
        let point = client.define_type("La/Point;", None, None);
        let gone = client.new_object(point);
        client.collect_object(gone.id);

        let snapshots = fetch_snapshots(
            &mut client,
            FRAME,
            &aliases([JdwpValue::Object(gone), JdwpValue::Int(1)]),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(
            snapshots.get(&JdwpValue::Int(1)),
            Some(&ValueSnapshot::PrimitiveConstant(DfType::int(1)))
        );
    }

    #[test]
    fn disconnects_abort_the_batch() {
        let mut client = MockJdwpClient::new();
        paused(&mut client, None);
        let text = client.new_string("x");
        client.fail_after(1);
        let err = fetch_snapshots(
            &mut client,
            FRAME,
            &aliases([JdwpValue::Object(text)]),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DfaAssistError::Jdwp(JdwpError::NotConnected)
        ));
    }

    #[test]
    fn cancellation_stops_fetching() {
        let mut client = MockJdwpClient::new();
        paused(&mut client, None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fetch_snapshots(&mut client, FRAME, &aliases([JdwpValue::Int(1)]), &cancel)
            .unwrap_err();
        assert!(matches!(err, DfaAssistError::Cancelled));
    }
}
