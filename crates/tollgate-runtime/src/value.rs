//! Runtime values seen by the validator.
//!
//! The sandbox host owns the real object model; this module carries just
//! enough of it for call validation: a value's type name, whether it is
//! callable, and where a callable came from.

use std::fmt;
use std::sync::Arc;

use tollgate_capabilities::{FunctionCapabilityDescriptor, VettedTypeDescriptor};

use crate::attribute::ContainerType;
use crate::error::CallResult;

pub use tollgate_config::BUILTINS_NAMESPACE;

/// Body of a callable.
pub type CallableFn = dyn Fn(&[Value]) -> CallResult<Value> + Send + Sync;

/// A value flowing through sandboxed code.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absent value.
    None,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Text.
    Str(String),
    /// Bytes.
    Bytes(Vec<u8>),
    /// Mutable sequence.
    List(Vec<Value>),
    /// Immutable sequence.
    Tuple(Vec<Value>),
    /// Mapping as ordered key/value pairs.
    Dict(Vec<(Value, Value)>),
    /// Mutable set.
    Set(Vec<Value>),
    /// Immutable set.
    FrozenSet(Vec<Value>),
    /// Something that can be called.
    Callable(Callable),
    /// An instance of a host type.
    Object(HostObject),
}

impl Value {
    /// Type name as seen by the sandboxed program.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Callable(callable) => callable.type_name(),
            Self::Object(object) => object.type_name(),
            other => other
                .container_type()
                .map_or("object", ContainerType::as_str),
        }
    }

    /// The container type of this value, if it is one.
    #[must_use]
    pub fn container_type(&self) -> Option<ContainerType> {
        match self {
            Self::Bool(_) => Some(ContainerType::Bool),
            Self::Int(_) => Some(ContainerType::Int),
            Self::Float(_) => Some(ContainerType::Float),
            Self::Str(_) => Some(ContainerType::Str),
            Self::Bytes(_) => Some(ContainerType::Bytes),
            Self::List(_) => Some(ContainerType::List),
            Self::Tuple(_) => Some(ContainerType::Tuple),
            Self::Dict(_) => Some(ContainerType::Dict),
            Self::Set(_) => Some(ContainerType::Set),
            Self::FrozenSet(_) => Some(ContainerType::FrozenSet),
            Self::None | Self::Callable(_) | Self::Object(_) => None,
        }
    }

    /// The string payload, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The callable, if this value is one.
    #[must_use]
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Self::Callable(callable) => Some(callable),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Self::Callable(callable)
    }
}

/// An instance of a host-provided type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostObject {
    type_name: String,
    vetted: Option<Arc<VettedTypeDescriptor>>,
}

impl HostObject {
    /// An instance of an unvetted host type.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            vetted: None,
        }
    }

    /// An instance of a vetted host type.
    #[must_use]
    pub fn vetted(descriptor: VettedTypeDescriptor) -> Self {
        Self {
            type_name: descriptor.type_name().to_string(),
            vetted: Some(Arc::new(descriptor)),
        }
    }

    /// Type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The type's vetting descriptor, if any.
    #[must_use]
    pub fn descriptor(&self) -> Option<&Arc<VettedTypeDescriptor>> {
        self.vetted.as_ref()
    }
}

/// The receiver a method was bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// A safe container value.
    Container(ContainerType),
    /// A host object.
    Object(HostObject),
}

impl Receiver {
    /// Type name of the receiver.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Container(ty) => ty.as_str(),
            Self::Object(object) => object.type_name(),
        }
    }

    /// The receiver of a method bound to `value`, if the value can have methods.
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Object(object) => Some(Self::Object(object.clone())),
            other => other.container_type().map(Self::Container),
        }
    }
}

/// Whether a callable is a free function or a method bound to a receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum CallableOrigin {
    /// A free function.
    Function,
    /// A method bound to a receiver.
    BoundMethod(Receiver),
}

/// A callable value.
///
/// The body is only ever run by [`Callable::invoke`]; the validator decides
/// first and invokes after.
#[derive(Clone)]
pub struct Callable {
    name: String,
    namespace: String,
    origin: CallableOrigin,
    descriptor: Option<Arc<FunctionCapabilityDescriptor>>,
    body: Arc<CallableFn>,
}

impl Callable {
    /// A free function declared in `namespace`.
    pub fn function<F>(name: impl Into<String>, namespace: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            origin: CallableOrigin::Function,
            descriptor: None,
            body: Arc::new(body),
        }
    }

    /// A vetted primitive, named after its descriptor.
    pub fn vetted<F>(descriptor: FunctionCapabilityDescriptor, body: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult<Value> + Send + Sync + 'static,
    {
        Self::function(
            descriptor.qualified_name().to_string(),
            descriptor.owning_module().to_string(),
            body,
        )
        .with_descriptor(descriptor)
    }

    /// A method named `method` bound to `receiver`.
    ///
    /// Container methods live in [`BUILTINS_NAMESPACE`]; host object methods
    /// live in their vetted type's module, or in the type's own name.
    pub fn method<F>(receiver: Receiver, method: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult<Value> + Send + Sync + 'static,
    {
        let namespace = match &receiver {
            Receiver::Container(_) => BUILTINS_NAMESPACE.to_string(),
            Receiver::Object(object) => match object.descriptor() {
                Some(descriptor) => descriptor.owning_module().to_string(),
                None => object.type_name().to_string(),
            },
        };
        Self {
            name: method.into(),
            namespace,
            origin: CallableOrigin::BoundMethod(receiver),
            descriptor: None,
            body: Arc::new(body),
        }
    }

    /// Attach a capability descriptor.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: FunctionCapabilityDescriptor) -> Self {
        self.descriptor = Some(Arc::new(descriptor));
        self
    }

    /// Override the declaring namespace.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Callable name (method name for bound methods).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace that declared the callable.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Function or bound method.
    #[must_use]
    pub fn origin(&self) -> &CallableOrigin {
        &self.origin
    }

    /// The attached capability descriptor, if vetted.
    #[must_use]
    pub fn descriptor(&self) -> Option<&Arc<FunctionCapabilityDescriptor>> {
        self.descriptor.as_ref()
    }

    /// Name used in diagnostics: `type.method` for bound methods.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.origin {
            CallableOrigin::Function => self.name.clone(),
            CallableOrigin::BoundMethod(receiver) => {
                format!("{}.{}", receiver.type_name(), self.name)
            },
        }
    }

    fn type_name(&self) -> &'static str {
        match (&self.origin, &self.descriptor) {
            (CallableOrigin::BoundMethod(_), _) => "method",
            (CallableOrigin::Function, Some(_)) => "builtin_function_or_method",
            (CallableOrigin::Function, None) => "function",
        }
    }

    /// Run the body without any validation.
    ///
    /// Only for call sites proven direct at compile time, and for the
    /// validator once it has allowed the call.
    ///
    /// # Errors
    ///
    /// Whatever the body returns.
    pub fn invoke(&self, args: &[Value]) -> CallResult<Value> {
        (self.body)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("origin", &self.origin)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
            && self.name == other.name
            && self.namespace == other.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &[Value]) -> CallResult<Value> {
        Ok(Value::None)
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::None.type_name(), "NoneType");
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::FrozenSet(vec![]).type_name(), "frozenset");
        assert_eq!(Value::Object(HostObject::new("Socket")).type_name(), "Socket");
        assert_eq!(
            Value::from(Callable::function("f", "__main__", noop)).type_name(),
            "function"
        );
        let vetted = Callable::vetted(FunctionCapabilityDescriptor::new("io.read", "io"), noop);
        assert_eq!(Value::from(vetted).type_name(), "builtin_function_or_method");
    }

    #[test]
    fn test_vetted_callable_takes_descriptor_identity() {
        let callable = Callable::vetted(FunctionCapabilityDescriptor::new("io.read", "io"), noop);
        assert_eq!(callable.name(), "io.read");
        assert_eq!(callable.namespace(), "io");
        assert!(callable.descriptor().is_some());
    }

    #[test]
    fn test_method_namespaces() {
        let on_str = Callable::method(Receiver::Container(ContainerType::Str), "upper", noop);
        assert_eq!(on_str.namespace(), BUILTINS_NAMESPACE);
        assert_eq!(on_str.display_name(), "str.upper");

        let frame = HostObject::vetted(VettedTypeDescriptor::new("DataFrame", "frames"));
        let on_frame = Callable::method(Receiver::Object(frame), "head", noop);
        assert_eq!(on_frame.namespace(), "frames");

        let socket = Callable::method(Receiver::Object(HostObject::new("Socket")), "send", noop);
        assert_eq!(socket.namespace(), "Socket");
    }

    #[test]
    fn test_receiver_of_value() {
        assert_eq!(
            Receiver::of(&Value::from("x")),
            Some(Receiver::Container(ContainerType::Str))
        );
        assert_eq!(Receiver::of(&Value::None), None);
    }

    #[test]
    fn test_clones_compare_equal() {
        let callable = Callable::function("f", "__main__", noop);
        assert_eq!(callable.clone(), callable);
        assert_ne!(Callable::function("f", "__main__", noop), callable);
    }
}
