use crate::errors::Error;

/// Primitive types, as they appear in descriptors and in `newarray`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BaseType {
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl BaseType {
    /// Array type code used by the `newarray` instruction
    pub fn newarray_code(self) -> u8 {
        match self {
            BaseType::Boolean => 4,
            BaseType::Char => 5,
            BaseType::Float => 6,
            BaseType::Double => 7,
            BaseType::Byte => 8,
            BaseType::Short => 9,
            BaseType::Int => 10,
            BaseType::Long => 11,
        }
    }

    /// Number of local variable (or operand stack) slots a value of this type occupies
    pub fn width(self) -> u16 {
        match self {
            BaseType::Long | BaseType::Double => 2,
            _ => 1,
        }
    }
}

/// Number of local variable slots occupied by a value of the given field type
///
/// `long` and `double` take two slots, everything else (including references and arrays)
/// takes one.
pub fn field_type_width(descriptor: &str) -> u16 {
    match descriptor.as_bytes().first() {
        Some(b'J') | Some(b'D') => 2,
        _ => 1,
    }
}

/// Split a method descriptor into its parameter descriptors
///
/// `"(I[JLjava/lang/String;)V"` scans to `["I", "[J", "Ljava/lang/String;"]`.
pub fn parameter_descriptors(descriptor: &str) -> Result<Vec<&str>, Error> {
    let bad = || Error::BadDescriptor(descriptor.to_string());

    let inner = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(parameters, _return_type)| parameters)
        .ok_or_else(bad)?;

    let mut parameters = vec![];
    let bytes = inner.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = start;
        while bytes.get(end) == Some(&b'[') {
            end += 1;
        }
        match bytes.get(end) {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => end += 1,
            Some(b'L') => {
                end = inner[end..].find(';').map(|semi| end + semi + 1).ok_or_else(bad)?;
            }
            _ => return Err(bad()),
        }
        parameters.push(&inner[start..end]);
        start = end;
    }
    Ok(parameters)
}

/// Total number of local variable slots occupied by a method's parameters
pub fn parameter_slots(descriptor: &str) -> Result<u16, Error> {
    Ok(parameter_descriptors(descriptor)?
        .iter()
        .map(|parameter| field_type_width(parameter))
        .sum())
}
