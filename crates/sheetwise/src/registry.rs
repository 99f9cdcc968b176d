//! Record key to (schema, handler) bindings

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::warn;

use crate::error::{Error, Result};
use crate::handler::RowHandler;
use crate::import::{SheetJob, TypedSheet};
use crate::schema::{RecordKey, Schema, SheetRecord};

/// Schema and handler registered for one record type
pub(crate) struct Binding<R: 'static> {
    pub(crate) schema: Arc<Schema<R>>,
    pub(crate) handler: Arc<dyn RowHandler<R>>,
}

struct Registered {
    record_type: &'static str,
    binding: Box<dyn Any + Send + Sync>,
}

/// Handlers for every importable record type.
///
/// Filled once at startup and then only read; the engine receives it by
/// reference.
///
/// ```rust
/// use sheetwise::{HandlerRegistry, RuleHandler, Schema, SheetType};
/// # use sheetwise::{Column, SchemaBuilder, SheetRecord};
/// # #[derive(Debug, Default, Clone)]
/// # struct Person { name: String }
/// # impl SheetRecord for Person {
/// #     fn layout() -> SchemaBuilder<Self> {
/// #         SchemaBuilder::new().column(
/// #             Column::new("name", "Name", 0).value(|p: &Person| &p.name, |p: &mut Person| &mut p.name),
/// #         )
/// #     }
/// # }
///
/// let mut registry = HandlerRegistry::new();
/// registry.register(Schema::<Person>::of().unwrap(), RuleHandler::new("people"));
/// assert!(registry.contains(SheetType::of::<Person>().key()));
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    bindings: HashMap<RecordKey, Registered>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the schema's record key to `handler`, replacing an earlier binding
    pub fn register<R, H>(&mut self, schema: Schema<R>, handler: H) -> &mut Self
    where
        R: 'static,
        H: RowHandler<R> + 'static,
    {
        self.register_shared(schema, Arc::new(handler))
    }

    /// Like [`register`](Self::register) for a handler that is shared elsewhere
    pub fn register_shared<R: 'static>(
        &mut self,
        schema: Schema<R>,
        handler: Arc<dyn RowHandler<R>>,
    ) -> &mut Self {
        let key = schema.key().clone();
        let registered = Registered {
            record_type: type_name::<R>(),
            binding: Box::new(Binding {
                schema: Arc::new(schema),
                handler,
            }),
        };
        if self.bindings.insert(key.clone(), registered).is_some() {
            warn!("replacing row handler registered for {}", key);
        }
        self
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.bindings.keys()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The schema registered under `key` for record type `R`
    pub fn schema<R: 'static>(&self, key: &RecordKey) -> Option<&Schema<R>> {
        self.binding::<R>(key).ok().map(|b| b.schema.as_ref())
    }

    pub(crate) fn binding<R: 'static>(&self, key: &RecordKey) -> Result<&Binding<R>> {
        let registered = self
            .bindings
            .get(key)
            .ok_or_else(|| Error::MissingHandler(key.to_string()))?;
        registered
            .binding
            .downcast_ref::<Binding<R>>()
            .ok_or_else(|| {
                Error::MissingHandler(format!(
                    "{} as {} (registered for {})",
                    key,
                    type_name::<R>(),
                    registered.record_type
                ))
            })
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.bindings.iter().map(|(k, r)| (k, r.record_type)))
            .finish()
    }
}

type Resolver = fn(&HandlerRegistry, &RecordKey) -> Result<Box<dyn SheetJob>>;

/// One sheet to import: a record key plus the record type behind it
#[derive(Clone)]
pub struct SheetType {
    key: RecordKey,
    record_type: &'static str,
    resolve: Resolver,
}

impl SheetType {
    /// The sheet of a [`SheetRecord`], under the key its layout declares
    pub fn of<R: SheetRecord>() -> Self {
        Self::keyed::<R>(R::layout().key())
    }

    /// A sheet registered under an explicit key
    pub fn keyed<R: Default + Clone + 'static>(key: impl Into<RecordKey>) -> Self {
        Self {
            key: key.into(),
            record_type: type_name::<R>(),
            resolve: resolve_sheet::<R>,
        }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn record_type(&self) -> &'static str {
        self.record_type
    }

    pub(crate) fn resolve(&self, registry: &HandlerRegistry) -> Result<Box<dyn SheetJob>> {
        (self.resolve)(registry, &self.key)
    }
}

impl fmt::Debug for SheetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetType")
            .field("key", &self.key)
            .field("record_type", &self.record_type)
            .finish()
    }
}

fn resolve_sheet<R: Default + Clone + 'static>(
    registry: &HandlerRegistry,
    key: &RecordKey,
) -> Result<Box<dyn SheetJob>> {
    let binding = registry.binding::<R>(key)?;
    Ok(Box::new(TypedSheet::new(
        Arc::clone(&binding.schema),
        Arc::clone(&binding.handler),
    )))
}
