use nova_flow::{ClassTable, JvmType, PrimitiveKind};

/// Maps a JVM type signature (`[[I`, `Lcom/example/Foo$Bar;`) to a type
/// visible in `table`. `None` for malformed signatures and unknown classes.
pub fn type_from_signature(signature: &str, table: &ClassTable) -> Option<JvmType> {
    let depth = signature.bytes().take_while(|b| *b == b'[').count();
    let mut ty = non_array_type(&signature[depth..], table)?;
    for _ in 0..depth {
        ty = ty.array_of();
    }
    Some(ty)
}

fn non_array_type(signature: &str, table: &ClassTable) -> Option<JvmType> {
    let mut chars = signature.chars();
    if let (Some(descriptor), None) = (chars.next(), chars.next()) {
        return PrimitiveKind::from_descriptor(descriptor).map(JvmType::Primitive);
    }
    let class = signature.strip_prefix('L')?.strip_suffix(';')?;
    if class.is_empty() {
        return None;
    }
    table.lookup(&class.replace('/', ".")).map(JvmType::Class)
}
