use std::sync::Arc;

use log::debug;

use crate::device::GpuAllocator;
use crate::error::{Error, Result};
use crate::identity::IdentityRegistry;
use crate::resource::Resources;
use crate::scene::{AsAny, ComponentBuilders};

/// Services a system may use while it is set up or torn down.
pub struct SetupCtx<'a> {
    pub ids: &'a Arc<IdentityRegistry>,
    pub gpu: &'a Arc<dyn GpuAllocator>,
    pub resources: &'a Resources,
    pub builders: &'a mut ComponentBuilders,
}

/// A named unit of startup and shutdown work.
pub trait System: AsAny + Send + 'static {
    fn name(&self) -> &'static str;

    fn setup(&mut self, ctx: &mut SetupCtx<'_>) -> Result<()>;

    fn teardown(&mut self, ctx: &mut SetupCtx<'_>) {
        let _ = ctx;
    }
}

/// Systems in registration order. Set up first to last, torn down last to first.
#[derive(Default)]
pub struct Systems {
    list: Vec<Box<dyn System>>,
}

impl Systems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a system. A duplicate name is a wiring bug and panics.
    pub fn register(&mut self, system: Box<dyn System>) {
        if let Err(e) = self.try_register(system) {
            panic!("register system: {e}");
        }
    }

    pub fn try_register(&mut self, system: Box<dyn System>) -> Result<()> {
        let name = system.name();
        if self.contains(name) {
            return Err(Error::already_exists("system", name));
        }
        debug!("Systems: registered '{name}'");
        self.list.push(system);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.list.iter().any(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.list.iter().map(|s| s.name()).collect()
    }

    /// The system called `name`, which must be a `T`.
    pub fn get<T: System>(&self, name: &str) -> Result<&T> {
        let system = self
            .list
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::not_found("system", name))?;
        (**system).as_any().downcast_ref::<T>().ok_or_else(|| Error::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn get_mut<T: System>(&mut self, name: &str) -> Result<&mut T> {
        let system = self
            .list
            .iter_mut()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::not_found("system", name))?;
        (**system).as_any_mut().downcast_mut::<T>().ok_or_else(|| Error::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Panicking [`get`](Self::get). Startup wiring only.
    pub fn must<T: System>(&self, name: &str) -> &T {
        match self.get::<T>(name) {
            Ok(s) => s,
            Err(e) => panic!("must: {e}"),
        }
    }

    pub(crate) fn setup_all(&mut self, ctx: &mut SetupCtx<'_>) -> Result<()> {
        for system in &mut self.list {
            debug!("Systems: setting up '{}'", system.name());
            system.setup(ctx)?;
        }
        Ok(())
    }

    pub(crate) fn teardown_all(&mut self, ctx: &mut SetupCtx<'_>) {
        for system in self.list.iter_mut().rev() {
            debug!("Systems: tearing down '{}'", system.name());
            system.teardown(ctx);
        }
    }
}

impl std::fmt::Debug for Systems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
