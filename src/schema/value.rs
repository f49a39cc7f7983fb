use super::SchemaError;

/// A decoded schema value.  Bitfields decode to a `Struct` of `Int`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(u64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Struct(Vec<(&'static str, Value)>),
}

impl Value {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Value::Int(v) => Some(*v),
            _             => None,
        }
    }

    /// Look up a named field of a `Struct` value.
    pub fn field(&self, name: &'static str) -> Result<&Value, SchemaError> {
        match self {
            Value::Struct(fields) => fields
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v)
                .ok_or(SchemaError::MissingField(name)),
            _ => Err(SchemaError::TypeMismatch { field: name, expected: "a struct member" }),
        }
    }

    /// Integer field narrowed to `T`; fails if the value does not fit.
    pub fn int_field<T: TryFrom<u64>>(&self, name: &'static str) -> Result<T, SchemaError> {
        let raw = self
            .field(name)?
            .as_int()
            .ok_or(SchemaError::TypeMismatch { field: name, expected: "an integer" })?;
        T::try_from(raw)
            .map_err(|_| SchemaError::TypeMismatch { field: name, expected: "in range" })
    }

    pub fn bool_field(&self, name: &'static str) -> Result<bool, SchemaError> {
        Ok(self.int_field::<u64>(name)? != 0)
    }

    pub fn bytes_field(&self, name: &'static str) -> Result<&[u8], SchemaError> {
        match self.field(name)? {
            Value::Bytes(b) => Ok(b),
            _ => Err(SchemaError::TypeMismatch { field: name, expected: "a byte string" }),
        }
    }

    pub fn list_field(&self, name: &'static str) -> Result<&[Value], SchemaError> {
        match self.field(name)? {
            Value::List(items) => Ok(items),
            _ => Err(SchemaError::TypeMismatch { field: name, expected: "a list" }),
        }
    }
}
