use std::collections::HashMap;

use crate::{
    signature_to_type_name, FieldId, FrameRef, JdwpClient, JdwpError, JdwpValue, Location,
    ObjectId, ObjectRef, ReferenceTypeId, ReferenceTypeInfo, STRING_SIGNATURE,
};

const CLASS_LOADER_SIGNATURE: &str = "Ljava/lang/ClassLoader;";
const APP_CLASS_LOADER_SIGNATURE: &str = "Ljdk/internal/loader/ClassLoaders$AppClassLoader;";

#[derive(Clone, Debug)]
pub struct MockFrame {
    pub location: Location,
    pub class_loader: Option<ObjectId>,
    pub this: Option<ObjectRef>,
    pub locals: HashMap<String, JdwpValue>,
}

impl MockFrame {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            class_loader: None,
            this: None,
            locals: HashMap::new(),
        }
    }

    pub fn with_local(mut self, name: impl Into<String>, value: JdwpValue) -> Self {
        self.locals.insert(name.into(), value);
        self
    }

    pub fn with_this(mut self, this: ObjectRef) -> Self {
        self.this = Some(this);
        self
    }

    pub fn with_class_loader(mut self, loader: Option<ObjectId>) -> Self {
        self.class_loader = loader;
        self
    }
}

#[derive(Clone, Debug)]
struct MockType {
    info: ReferenceTypeInfo,
    fields: Vec<(FieldId, String)>,
}

#[derive(Clone, Debug, Default)]
struct MockInstance {
    type_id: ReferenceTypeId,
    fields: HashMap<FieldId, JdwpValue>,
    string: Option<String>,
    array_length: Option<i32>,
}

/// Deterministic, in-memory JVM heap and frame model.
///
/// Ids for types, fields and objects share one counter so a mix-up in a test
/// surfaces as an invalid-id error instead of silently reading the wrong entity.
#[derive(Default)]
pub struct MockJdwpClient {
    next_id: u64,
    types: HashMap<ReferenceTypeId, MockType>,
    types_by_signature: HashMap<String, ReferenceTypeId>,
    objects: HashMap<ObjectId, MockInstance>,
    frames: HashMap<FrameRef, MockFrame>,
    assertion_status: HashMap<String, Option<bool>>,
    fail_after: Option<usize>,
    calls: usize,
}

impl MockJdwpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Number of JDWP queries served so far (including failed ones).
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Simulate the VM resuming (or dying) after `calls` more queries: every
    /// subsequent query fails with [`JdwpError::NotConnected`].
    pub fn fail_after(&mut self, calls: usize) {
        self.fail_after = Some(self.calls + calls);
    }

    pub fn define_type(
        &mut self,
        signature: &str,
        superclass: Option<ReferenceTypeId>,
        class_loader: Option<ObjectId>,
    ) -> ReferenceTypeId {
        self.define(signature, superclass, class_loader, false)
    }

    pub fn define_enum(
        &mut self,
        signature: &str,
        class_loader: Option<ObjectId>,
    ) -> ReferenceTypeId {
        let enum_base = self.ensure_type("Ljava/lang/Enum;", None);
        if self.declared_field(enum_base, "name").is_none() {
            self.add_field(enum_base, "name");
        }
        self.define(signature, Some(enum_base), class_loader, true)
    }

    fn define(
        &mut self,
        signature: &str,
        superclass: Option<ReferenceTypeId>,
        class_loader: Option<ObjectId>,
        is_enum: bool,
    ) -> ReferenceTypeId {
        let id = self.fresh_id();
        self.types.insert(
            id,
            MockType {
                info: ReferenceTypeInfo {
                    id,
                    signature: signature.to_string(),
                    class_loader,
                    superclass,
                    is_enum,
                },
                fields: Vec::new(),
            },
        );
        self.types_by_signature.insert(signature.to_string(), id);
        id
    }

    fn ensure_type(
        &mut self,
        signature: &str,
        superclass: Option<ReferenceTypeId>,
    ) -> ReferenceTypeId {
        match self.types_by_signature.get(signature) {
            Some(id) => *id,
            None => self.define(signature, superclass, None, false),
        }
    }

    pub fn add_field(&mut self, type_id: ReferenceTypeId, name: &str) -> FieldId {
        let id = self.fresh_id();
        if let Some(ty) = self.types.get_mut(&type_id) {
            ty.fields.push((id, name.to_string()));
        }
        id
    }

    fn declared_field(&self, type_id: ReferenceTypeId, name: &str) -> Option<FieldId> {
        self.types
            .get(&type_id)?
            .fields
            .iter()
            .find(|(_, field)| field == name)
            .map(|(id, _)| *id)
    }

    fn field_in_hierarchy(&self, type_id: ReferenceTypeId, name: &str) -> Option<FieldId> {
        let mut current = Some(type_id);
        while let Some(id) = current {
            if let Some(field) = self.declared_field(id, name) {
                return Some(field);
            }
            current = self.types.get(&id)?.info.superclass;
        }
        None
    }

    fn object_ref(&self, id: ObjectId, type_id: ReferenceTypeId) -> ObjectRef {
        let runtime_type = self
            .types
            .get(&type_id)
            .map(|ty| signature_to_type_name(&ty.info.signature))
            .unwrap_or_default();
        ObjectRef { id, runtime_type }
    }

    pub fn new_object(&mut self, type_id: ReferenceTypeId) -> ObjectRef {
        let id = self.fresh_id();
        self.objects.insert(
            id,
            MockInstance {
                type_id,
                ..MockInstance::default()
            },
        );
        self.object_ref(id, type_id)
    }

    /// Instance of an enum type; the constant name is stored in `Enum.name`.
    pub fn new_enum_constant(&mut self, type_id: ReferenceTypeId, name: &str) -> ObjectRef {
        let obj = self.new_object(type_id);
        let name = self.new_string(name);
        self.set_field(obj.id, "name", JdwpValue::Object(name));
        obj
    }

    pub fn new_string(&mut self, text: &str) -> ObjectRef {
        let type_id = self.ensure_type(STRING_SIGNATURE, None);
        let obj = self.new_object(type_id);
        if let Some(instance) = self.objects.get_mut(&obj.id) {
            instance.string = Some(text.to_string());
        }
        obj
    }

    pub fn new_array(&mut self, signature: &str, length: i32) -> ObjectRef {
        let type_id = self.ensure_type(signature, None);
        let obj = self.new_object(type_id);
        if let Some(instance) = self.objects.get_mut(&obj.id) {
            instance.array_length = Some(length);
        }
        obj
    }

    /// Creates an application class loader whose `ClassLoader.parent` field
    /// points at `parent`.
    pub fn new_class_loader(&mut self, parent: Option<&ObjectRef>) -> ObjectRef {
        let base = self.ensure_type(CLASS_LOADER_SIGNATURE, None);
        if self.declared_field(base, "parent").is_none() {
            self.add_field(base, "parent");
        }
        let app = self.ensure_type(APP_CLASS_LOADER_SIGNATURE, Some(base));
        let loader = self.new_object(app);
        let parent = parent.map_or(JdwpValue::Null, |p| JdwpValue::Object(p.clone()));
        self.set_field(loader.id, "parent", parent);
        loader
    }

    /// Sets an instance field, declaring it on the object's runtime type if no
    /// type in the hierarchy declares it yet.
    pub fn set_field(&mut self, object: ObjectId, name: &str, value: JdwpValue) {
        let Some(type_id) = self.objects.get(&object).map(|o| o.type_id) else {
            return;
        };
        let field = match self.field_in_hierarchy(type_id, name) {
            Some(field) => field,
            None => self.add_field(type_id, name),
        };
        if let Some(instance) = self.objects.get_mut(&object) {
            instance.fields.insert(field, value);
        }
    }

    pub fn collect_object(&mut self, object: ObjectId) {
        self.objects.remove(&object);
    }

    pub fn set_frame(&mut self, frame: FrameRef, data: MockFrame) {
        self.frames.insert(frame, data);
    }

    pub fn set_local(&mut self, frame: FrameRef, name: &str, value: JdwpValue) {
        if let Some(data) = self.frames.get_mut(&frame) {
            data.locals.insert(name.to_string(), value);
        }
    }

    pub fn set_assertion_status(&mut self, class_signature: &str, status: Option<bool>) {
        self.assertion_status
            .insert(class_signature.to_string(), status);
    }

    fn tick(&mut self) -> Result<(), JdwpError> {
        self.calls += 1;
        match self.fail_after {
            Some(limit) if self.calls > limit => Err(JdwpError::NotConnected),
            _ => Ok(()),
        }
    }

    fn frame(&self, frame: FrameRef) -> Result<&MockFrame, JdwpError> {
        self.frames.get(&frame).ok_or(JdwpError::InvalidFrame(frame))
    }

    fn instance(&self, object: ObjectId) -> Result<&MockInstance, JdwpError> {
        self.objects
            .get(&object)
            .ok_or(JdwpError::InvalidObjectId(object))
    }
}

impl JdwpClient for MockJdwpClient {
    fn location(&mut self, frame: FrameRef) -> Result<Location, JdwpError> {
        self.tick()?;
        Ok(self.frame(frame)?.location.clone())
    }

    fn frame_class_loader(&mut self, frame: FrameRef) -> Result<Option<ObjectId>, JdwpError> {
        self.tick()?;
        Ok(self.frame(frame)?.class_loader)
    }

    fn local_value(&mut self, frame: FrameRef, name: &str) -> Result<Option<JdwpValue>, JdwpError> {
        self.tick()?;
        Ok(self.frame(frame)?.locals.get(name).cloned())
    }

    fn this_object(&mut self, frame: FrameRef) -> Result<Option<ObjectRef>, JdwpError> {
        self.tick()?;
        Ok(self.frame(frame)?.this.clone())
    }

    fn object_type(&mut self, object: ObjectId) -> Result<ReferenceTypeId, JdwpError> {
        self.tick()?;
        Ok(self.instance(object)?.type_id)
    }

    fn reference_type(&mut self, type_id: ReferenceTypeId) -> Result<ReferenceTypeInfo, JdwpError> {
        self.tick()?;
        self.types
            .get(&type_id)
            .map(|ty| ty.info.clone())
            .ok_or_else(|| JdwpError::Other(format!("unknown reference type {type_id}")))
    }

    fn field_by_name(
        &mut self,
        type_id: ReferenceTypeId,
        name: &str,
    ) -> Result<Option<FieldId>, JdwpError> {
        self.tick()?;
        Ok(self.declared_field(type_id, name))
    }

    fn object_field_value(
        &mut self,
        object: ObjectId,
        field: FieldId,
    ) -> Result<JdwpValue, JdwpError> {
        self.tick()?;
        Ok(self
            .instance(object)?
            .fields
            .get(&field)
            .cloned()
            .unwrap_or(JdwpValue::Null))
    }

    fn string_value(&mut self, object: ObjectId) -> Result<String, JdwpError> {
        self.tick()?;
        self.instance(object)?
            .string
            .clone()
            .ok_or_else(|| JdwpError::Other(format!("object {object} is not a string")))
    }

    fn array_length(&mut self, object: ObjectId) -> Result<i32, JdwpError> {
        self.tick()?;
        self.instance(object)?
            .array_length
            .ok_or_else(|| JdwpError::Other(format!("object {object} is not an array")))
    }

    fn effective_assertion_status(
        &mut self,
        location: &Location,
    ) -> Result<Option<bool>, JdwpError> {
        self.tick()?;
        Ok(self
            .assertion_status
            .get(&location.class_signature)
            .copied()
            .flatten())
    }
}
