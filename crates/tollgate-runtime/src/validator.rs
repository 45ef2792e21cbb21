//! The call validator.
//!
//! Every call site the classifier could not prove safe is compiled into a
//! call to [`CallValidator::safe_call`]. The validator sorts the target into
//! one [`CallPermission`] and either invokes it or fails without running it.
//! The decision depends only on the callable's metadata and the calling
//! thread's capability context, never on how the callable was reached.

use std::fmt;
use std::sync::Arc;

use tollgate_capabilities::{CapabilityError, FunctionCapabilityDescriptor, scope};
use tollgate_config::{Config, DEFAULT_PROGRAM_NAMESPACE, is_reserved_namespace};

use crate::attribute::{AttributePolicy, DenyAllAttributePolicy};
use crate::error::{CallError, CallResult};
use crate::value::{Callable, CallableOrigin, Receiver, Value};

/// Why a callable may (or may not) be invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallPermission {
    /// Carries a capability descriptor; requirements are checked at call time.
    Vetted(Arc<FunctionCapabilityDescriptor>),
    /// Declared by the sandboxed program.
    ProgramDefined,
    /// An approved method on a safe container type.
    SafeTypeMethod,
    /// A method on an instance of a vetted host type.
    VettedTypeMethod,
    /// None of the above.
    Unauthorized,
}

impl CallPermission {
    /// Whether the callable may run, subject to capability checks for `Vetted`.
    #[must_use]
    pub fn is_permitted(&self) -> bool {
        !matches!(self, Self::Unauthorized)
    }
}

impl fmt::Display for CallPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vetted(_) => write!(f, "vetted"),
            Self::ProgramDefined => write!(f, "program_defined"),
            Self::SafeTypeMethod => write!(f, "safe_type_method"),
            Self::VettedTypeMethod => write!(f, "vetted_type_method"),
            Self::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

/// Validates and performs calls from sandboxed code.
#[derive(Debug, Clone)]
pub struct CallValidator {
    program_namespace: String,
    policy: Arc<dyn AttributePolicy>,
}

impl Default for CallValidator {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM_NAMESPACE, Arc::new(DenyAllAttributePolicy))
    }
}

impl CallValidator {
    /// Create a validator for a program whose own code lives in `program_namespace`.
    #[must_use]
    pub fn new(program_namespace: impl Into<String>, policy: Arc<dyn AttributePolicy>) -> Self {
        Self {
            program_namespace: program_namespace.into(),
            policy,
        }
    }

    /// Build a validator from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        crate::config_bridge::to_call_validator(config)
    }

    /// Replace the attribute-access policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn AttributePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Namespace of the sandboxed program's own compilation unit.
    #[must_use]
    pub fn program_namespace(&self) -> &str {
        &self.program_namespace
    }

    /// Sort `callable` into its permission category. First match wins.
    #[must_use]
    pub fn classify(&self, callable: &Callable) -> CallPermission {
        if let Some(descriptor) = callable.descriptor() {
            return CallPermission::Vetted(Arc::clone(descriptor));
        }

        // Only plain functions can be program code; methods always go through
        // the receiver checks below.
        if matches!(callable.origin(), CallableOrigin::Function)
            && callable.namespace() == self.program_namespace
            && !is_reserved_namespace(callable.namespace())
        {
            return CallPermission::ProgramDefined;
        }

        match callable.origin() {
            CallableOrigin::BoundMethod(Receiver::Container(ty))
                if self.policy.is_approved(*ty, callable.name()) =>
            {
                CallPermission::SafeTypeMethod
            },
            CallableOrigin::BoundMethod(Receiver::Object(object))
                if object.descriptor().is_some() =>
            {
                CallPermission::VettedTypeMethod
            },
            _ => CallPermission::Unauthorized,
        }
    }

    /// Validate a call to `target` with `args`, then perform it.
    ///
    /// The callee runs only after every check has passed; a denied call has
    /// no side effects.
    ///
    /// # Errors
    ///
    /// - [`CallError::NotCallable`] if `target` is not callable.
    /// - [`CallError::Capability`] if a vetted callable's requirements are not met.
    /// - [`CallError::Unauthorized`] if the callable is in no permitted category.
    /// - Any error returned by the callee itself.
    pub fn safe_call(&self, target: &Value, args: &[Value]) -> CallResult<Value> {
        let Value::Callable(callable) = target else {
            tracing::warn!(type_name = target.type_name(), "call to non-callable value");
            return Err(CallError::NotCallable {
                type_name: target.type_name().to_string(),
            });
        };

        let permission = self.classify(callable);
        if let Err(e) = self.authorize(callable, &permission, args) {
            tracing::warn!(
                callable = %callable.display_name(),
                namespace = callable.namespace(),
                permission = %permission,
                error = %e,
                "call denied"
            );
            return Err(e);
        }

        tracing::debug!(
            callable = %callable.display_name(),
            namespace = callable.namespace(),
            permission = %permission,
            "call allowed"
        );
        callable.invoke(args)
    }

    fn authorize(
        &self,
        callable: &Callable,
        permission: &CallPermission,
        args: &[Value],
    ) -> CallResult<()> {
        match permission {
            CallPermission::Vetted(descriptor) => {
                if descriptor.is_capability_free() {
                    return Ok(());
                }
                let resource = bound_resource(descriptor, args)?;
                scope::check_capabilities_for(descriptor.required_capabilities(), resource)?;
                Ok(())
            },
            CallPermission::ProgramDefined
            | CallPermission::SafeTypeMethod
            | CallPermission::VettedTypeMethod => Ok(()),
            CallPermission::Unauthorized => Err(CallError::unauthorized(
                callable.display_name(),
                callable.namespace(),
            )),
        }
    }
}

/// The argument a descriptor binds as the call's resource.
fn bound_resource<'a>(
    descriptor: &FunctionCapabilityDescriptor,
    args: &'a [Value],
) -> CallResult<Option<&'a str>> {
    let Some(index) = descriptor.resource_argument() else {
        return Ok(None);
    };
    args.get(index)
        .and_then(Value::as_str)
        .map(Some)
        .ok_or_else(|| {
            CallError::Capability(CapabilityError::ResourceArgument {
                function: descriptor.qualified_name().to_string(),
                index,
            })
        })
}
