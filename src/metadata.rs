//! Class-keyed declarations and their resolved, cached form.
//!
//! The [`MetadataStore`] is the single home of everything declared about
//! models and controllers.  Declarations are additive across inheritance:
//! resolving a class copies its parent chain's resolved metadata and extends
//! it with the class's own fields and validators.  Resolved metadata is cached
//! against the exact class and never invalidated, so a class whose metadata
//! has been resolved is sealed against further declarations.
//!
//! ```rust
//! use eki::{FieldDescriptor, MetadataStore};
//!
//! let store = MetadataStore::new();
//! store.model("Base").field(FieldDescriptor::int("id")).register().unwrap();
//! store
//!     .model("User")
//!     .extends("Base")
//!     .field(FieldDescriptor::string("name").required())
//!     .register()
//!     .unwrap();
//!
//! let user = store.resolve_model(&"User".into()).unwrap();
//! let names: Vec<_> = user.fields().iter().map(|f| f.name.as_str()).collect();
//! assert_eq!(names, ["id", "name"]);
//! assert_eq!(store.resolve_model(&"Base".into()).unwrap().fields().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use convert_case::{Case, Casing};
use parking_lot::RwLock;

use crate::validation::bind_rule;
use crate::validators::required;
use crate::{
    ClassHierarchy, ClassKey, ControllerDescriptor, DeclarationError, FieldType, PropertyKind,
    PropertyLists, Rule, Source, ValidationBuilder, ValidationSchema, Validator,
};

/////////////////////////////////////////// FieldDescriptor ////////////////////////////////////////////

/// Metadata for one model field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// The field name.
    pub name: String,
    /// The declared type.
    pub field_type: FieldType,
    /// Whether a value must be present.
    pub required: bool,
    /// Human readable name used in messages.
    pub label: String,
    /// Lookup key in the request data, when it differs from the name.
    pub key: Option<String>,
    /// The only bucket to read from; `None` probes query, params, body.
    pub source: Option<Source>,
    validators: Vec<Arc<dyn Validator>>,
}

impl FieldDescriptor {
    /// A field named `name` of type `field_type`, labelled with the title-cased
    /// name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        let label = name.to_case(Case::Title);
        Self {
            name,
            field_type,
            required: false,
            label,
            key: None,
            source: None,
            validators: Vec::new(),
        }
    }

    /// A string field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// A number field.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// An integer field.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// A boolean field.
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// A date field.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    /// A nested model field.
    pub fn model(name: impl Into<String>, class: impl Into<ClassKey>) -> Self {
        Self::new(name, FieldType::Model(class.into()))
    }

    /// A list field.
    pub fn array(name: impl Into<String>, inner: FieldType) -> Self {
        Self::new(name, FieldType::array_of(inner))
    }

    /// Marks the field required and attaches a [`Required`](crate::validators::Required)
    /// validator.
    pub fn required(mut self) -> Self {
        if !self.required {
            self.required = true;
            self.validators.push(bind_rule(&self.name, required()));
        }
        self
    }

    /// Overrides the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Overrides the lookup key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Reads the field from one bucket only.
    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Attaches a validator to this field.
    pub fn validate<R: Rule>(mut self, rule: R) -> Self {
        self.validators.push(bind_rule(&self.name, rule));
        self
    }

    /// The key to look up in request data.
    pub fn lookup_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    /// Validators attached at declaration.
    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }
}

//////////////////////////////////////////// ModelMetadata /////////////////////////////////////////////

/// The resolved metadata of one model class.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    class: ClassKey,
    parent: Option<ClassKey>,
    fields: Vec<FieldDescriptor>,
    schema: ValidationSchema,
}

impl ModelMetadata {
    /// The class this metadata belongs to.
    pub fn class(&self) -> &ClassKey {
        &self.class
    }

    /// The nearest ancestor that declares a model, if any.
    pub fn parent(&self) -> Option<&ClassKey> {
        self.parent.as_ref()
    }

    /// Fields in declaration order, inherited fields first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// The field named `name`.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The compiled validation schema.
    pub fn schema(&self) -> &ValidationSchema {
        &self.schema
    }
}

/////////////////////////////////////////////// Model //////////////////////////////////////////////////

/// A Rust type that declares a model.  Usually derived with
/// `#[derive(Model)]`.
pub trait Model {
    /// The class key of the model.
    fn class_key() -> ClassKey;

    /// The class key of the model this one extends.
    fn parent_key() -> Option<ClassKey> {
        None
    }

    /// The model's own field descriptors.
    fn fields() -> Vec<FieldDescriptor>;

    /// Declares models this one refers to: its parent and nested field types.
    fn declare_dependencies(_declarer: &mut Declarer<'_>) -> Result<(), DeclarationError> {
        Ok(())
    }
}

/// Declares [`Model`] types while holding the store's declaration lock.
///
/// [`MetadataStore::declare`] creates one and hands it to
/// [`Model::declare_dependencies`], so a model and everything it refers to
/// become visible together.
pub struct Declarer<'a> {
    store: &'a MetadataStore,
    decls: &'a mut Declarations,
}

impl Declarer<'_> {
    /// Declares `T` unless it already is, then its dependencies.
    pub fn declare<T: Model>(&mut self) -> Result<ClassKey, DeclarationError> {
        let class = T::class_key();
        if self.decls.models.contains_key(&class) {
            return Ok(class);
        }
        let parent = T::parent_key();
        self.store.class_in(self.decls, &class, parent.as_ref())?;
        self.store.model_in(self.decls, &class)?;
        for field in T::fields() {
            self.store.field_in(self.decls, &class, field)?;
        }
        T::declare_dependencies(self)?;
        Ok(class)
    }
}

//////////////////////////////////////////// MetadataStore /////////////////////////////////////////////

#[derive(Debug, Default)]
struct ModelDeclaration {
    fields: HashMap<String, FieldDescriptor>,
    validators: Vec<Arc<dyn Validator>>,
}

#[derive(Debug, Default)]
struct Declarations {
    hierarchy: ClassHierarchy,
    properties: PropertyLists,
    models: HashMap<ClassKey, ModelDeclaration>,
    controllers: HashMap<ClassKey, Arc<ControllerDescriptor>>,
}

impl Declarations {
    fn has_model(&self, class: &ClassKey) -> bool {
        self.models.contains_key(class)
            || self
                .hierarchy
                .ancestors(class)
                .any(|a| self.models.contains_key(a))
    }

    /// Field names visible from `class`, root ancestor's first.
    fn field_order(&self, class: &ClassKey) -> Vec<String> {
        let mut chain: Vec<&ClassKey> = self.hierarchy.ancestors(class).collect();
        chain.reverse();
        chain.push(class);
        let mut order: Vec<String> = Vec::new();
        for link in chain {
            for name in self.properties.get(&self.hierarchy, link, PropertyKind::Field) {
                if !order.contains(name) {
                    order.push(name.clone());
                }
            }
        }
        order
    }
}

/// Process-wide declarations plus the resolved-metadata cache.
#[derive(Debug, Default)]
pub struct MetadataStore {
    declarations: RwLock<Declarations>,
    models: RwLock<HashMap<ClassKey, Arc<ModelMetadata>>>,
}

impl MetadataStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts declaring a model class.
    pub fn model(&self, class: impl Into<ClassKey>) -> ModelBuilder<'_> {
        ModelBuilder {
            store: self,
            class: class.into(),
            parent: None,
            fields: Vec::new(),
            validations: Vec::new(),
        }
    }

    /// Declares `T` and the models it depends on.  Declaring the same type
    /// again is a no-op.
    ///
    /// The whole declaration, dependencies included, happens under one lock,
    /// so a concurrent resolution never observes a partially declared model.
    pub fn declare<T: Model>(&self) -> Result<ClassKey, DeclarationError> {
        let class = T::class_key();
        if self.declarations.read().models.contains_key(&class) {
            return Ok(class);
        }
        let mut decls = self.declarations.write();
        Declarer {
            store: self,
            decls: &mut *decls,
        }
        .declare::<T>()
    }

    /// Records `class`, optionally extending `parent`.
    pub fn define_class(
        &self,
        class: &ClassKey,
        parent: Option<&ClassKey>,
    ) -> Result<(), DeclarationError> {
        let mut decls = self.declarations.write();
        self.class_in(&mut decls, class, parent)
    }

    /// Marks `class` as a model, even one without fields of its own.
    pub fn define_model(&self, class: &ClassKey) -> Result<(), DeclarationError> {
        let mut decls = self.declarations.write();
        self.model_in(&mut decls, class)
    }

    /// Attaches or overwrites one field of `class`.  Overwriting drops the
    /// validators the previous descriptor carried.
    pub fn define_field(
        &self,
        class: &ClassKey,
        descriptor: FieldDescriptor,
    ) -> Result<(), DeclarationError> {
        let mut decls = self.declarations.write();
        self.field_in(&mut decls, class, descriptor)
    }

    fn class_in(
        &self,
        decls: &mut Declarations,
        class: &ClassKey,
        parent: Option<&ClassKey>,
    ) -> Result<(), DeclarationError> {
        if decls.hierarchy.parent(class) != parent
            && parent.is_some()
            && self.is_sealed(decls, class)
        {
            return Err(DeclarationError::Sealed {
                class: class.clone(),
            });
        }
        decls.hierarchy.declare(class, parent)
    }

    fn model_in(&self, decls: &mut Declarations, class: &ClassKey) -> Result<(), DeclarationError> {
        if decls.models.contains_key(class) {
            return Ok(());
        }
        self.check_sealed(decls, class)?;
        if !decls.hierarchy.contains(class) {
            decls.hierarchy.declare(class, None)?;
        }
        decls.models.insert(class.clone(), ModelDeclaration::default());
        Ok(())
    }

    fn field_in(
        &self,
        decls: &mut Declarations,
        class: &ClassKey,
        descriptor: FieldDescriptor,
    ) -> Result<(), DeclarationError> {
        self.check_sealed(decls, class)?;
        if !decls.hierarchy.contains(class) {
            decls.hierarchy.declare(class, None)?;
        }
        let Declarations {
            hierarchy,
            properties,
            models,
            ..
        } = decls;
        properties.add(hierarchy, class, PropertyKind::Field, &descriptor.name);
        let model = models.entry(class.clone()).or_default();
        if let Some(previous) = model.fields.remove(&descriptor.name) {
            model
                .validators
                .retain(|v| !previous.validators.iter().any(|p| Arc::ptr_eq(p, v)));
        }
        model.validators.extend(descriptor.validators.iter().cloned());
        model.fields.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    fn validation_in<F>(
        &self,
        decls: &mut Declarations,
        class: &ClassKey,
        build: F,
    ) -> Result<(), DeclarationError>
    where
        F: FnOnce(&mut ValidationBuilder),
    {
        if !decls.has_model(class) {
            return Err(DeclarationError::MissingModel {
                class: class.clone(),
            });
        }
        self.check_sealed(decls, class)?;
        let mut builder = ValidationBuilder::new(class.clone(), decls.field_order(class));
        build(&mut builder);
        let validators = builder.finish()?;
        decls
            .models
            .entry(class.clone())
            .or_default()
            .validators
            .extend(validators);
        Ok(())
    }

    /// Registers validators for `class`.
    ///
    /// The closure sees every field visible from the class, inherited ones
    /// included.  Naming any other field fails the whole registration.
    pub fn validation<F>(&self, class: &ClassKey, build: F) -> Result<(), DeclarationError>
    where
        F: FnOnce(&mut ValidationBuilder),
    {
        let fields = {
            let decls = self.declarations.read();
            if !decls.has_model(class) {
                return Err(DeclarationError::MissingModel {
                    class: class.clone(),
                });
            }
            self.check_sealed(&decls, class)?;
            decls.field_order(class)
        };
        let mut builder = ValidationBuilder::new(class.clone(), fields);
        build(&mut builder);
        let validators = builder.finish()?;
        let mut decls = self.declarations.write();
        self.check_sealed(&decls, class)?;
        decls
            .models
            .entry(class.clone())
            .or_default()
            .validators
            .extend(validators);
        Ok(())
    }

    /// True if `class` or one of its ancestors declares a model.
    pub fn is_model(&self, class: &ClassKey) -> bool {
        self.declarations.read().has_model(class)
    }

    /// The merged metadata of `class`, resolved once and cached.
    pub fn resolve_model(&self, class: &ClassKey) -> Result<Arc<ModelMetadata>, DeclarationError> {
        if let Some(found) = self.models.read().get(class) {
            return Ok(Arc::clone(found));
        }
        let decls = self.declarations.read();
        self.resolve_with(&decls, class)
    }

    fn resolve_with(
        &self,
        decls: &Declarations,
        class: &ClassKey,
    ) -> Result<Arc<ModelMetadata>, DeclarationError> {
        if let Some(found) = self.models.read().get(class) {
            return Ok(Arc::clone(found));
        }
        if !decls.has_model(class) {
            return Err(DeclarationError::MissingModel {
                class: class.clone(),
            });
        }
        let parent = match decls.hierarchy.parent(class) {
            Some(parent) if decls.has_model(parent) => Some(self.resolve_with(decls, parent)?),
            _ => None,
        };
        let own = decls.models.get(class);
        let mut fields = Vec::new();
        for name in decls.field_order(class) {
            let descriptor = own
                .and_then(|own| own.fields.get(&name))
                .or_else(|| parent.as_ref().and_then(|p| p.field(&name)));
            if let Some(descriptor) = descriptor {
                fields.push(descriptor.clone());
            }
        }
        let mut schema = parent
            .as_ref()
            .map(|p| p.schema().clone())
            .unwrap_or_default();
        if let Some(own) = own {
            schema.extend(own.validators.iter().cloned());
        }
        let metadata = Arc::new(ModelMetadata {
            class: class.clone(),
            parent: parent.as_ref().map(|p| p.class().clone()),
            fields,
            schema,
        });
        tracing::debug!(
            class = %class,
            fields = metadata.fields.len(),
            validators = metadata.schema.len(),
            "resolved model metadata"
        );
        let mut cache = self.models.write();
        Ok(Arc::clone(cache.entry(class.clone()).or_insert(metadata)))
    }

    /// Records a controller descriptor.
    pub fn define_controller(
        &self,
        descriptor: ControllerDescriptor,
    ) -> Result<Arc<ControllerDescriptor>, DeclarationError> {
        let mut decls = self.declarations.write();
        let class = descriptor.class.clone();
        if decls.controllers.contains_key(&class) {
            return Err(DeclarationError::DuplicateController { class });
        }
        if !decls.hierarchy.contains(&class) {
            decls.hierarchy.declare(&class, None)?;
        }
        let Declarations {
            hierarchy,
            properties,
            controllers,
            ..
        } = &mut *decls;
        for action in descriptor.actions() {
            properties.add(hierarchy, &class, PropertyKind::Action, &action.name);
        }
        let descriptor = Arc::new(descriptor);
        controllers.insert(class, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// The descriptor of a declared controller.
    pub fn controller(&self, class: &ClassKey) -> Result<Arc<ControllerDescriptor>, DeclarationError> {
        self.declarations
            .read()
            .controllers
            .get(class)
            .cloned()
            .ok_or_else(|| DeclarationError::MissingController {
                class: class.clone(),
            })
    }

    /// Action names declared on a controller, in declaration order.
    pub fn action_names(&self, class: &ClassKey) -> Vec<String> {
        let decls = self.declarations.read();
        decls
            .properties
            .get(&decls.hierarchy, class, PropertyKind::Action)
            .to_vec()
    }

    fn is_sealed(&self, decls: &Declarations, class: &ClassKey) -> bool {
        let cache = self.models.read();
        cache.contains_key(class) || cache.keys().any(|k| decls.hierarchy.is_a(k, class))
    }

    fn check_sealed(&self, decls: &Declarations, class: &ClassKey) -> Result<(), DeclarationError> {
        if self.is_sealed(decls, class) {
            return Err(DeclarationError::Sealed {
                class: class.clone(),
            });
        }
        Ok(())
    }
}

///////////////////////////////////////////// ModelBuilder /////////////////////////////////////////////

type ValidationFn<'a> = Box<dyn FnOnce(&mut ValidationBuilder) + 'a>;

/// Fluent declaration of one model class.  Nothing is recorded until
/// [`register`](Self::register).
pub struct ModelBuilder<'a> {
    store: &'a MetadataStore,
    class: ClassKey,
    parent: Option<ClassKey>,
    fields: Vec<FieldDescriptor>,
    validations: Vec<ValidationFn<'a>>,
}

impl<'a> ModelBuilder<'a> {
    /// Inherits from `parent`.
    pub fn extends(mut self, parent: impl Into<ClassKey>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declares one field.
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Adds validators once the fields are declared.
    pub fn validation<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ValidationBuilder) + 'a,
    {
        self.validations.push(Box::new(build));
        self
    }

    /// Records everything with the store in one step.  The validation
    /// closures run while the store is locked and must not call back into it.
    pub fn register(self) -> Result<ClassKey, DeclarationError> {
        let ModelBuilder {
            store,
            class,
            parent,
            fields,
            validations,
        } = self;
        let mut decls = store.declarations.write();
        store.class_in(&mut decls, &class, parent.as_ref())?;
        store.model_in(&mut decls, &class)?;
        for field in fields {
            store.field_in(&mut decls, &class, field)?;
        }
        for build in validations {
            store.validation_in(&mut decls, &class, build)?;
        }
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::length_of;

    fn key(name: &str) -> ClassKey {
        ClassKey::new(name)
    }

    fn layered() -> MetadataStore {
        let store = MetadataStore::new();
        store
            .model("Base")
            .field(FieldDescriptor::int("id").required())
            .register()
            .unwrap();
        store
            .model("Person")
            .extends("Base")
            .field(FieldDescriptor::string("name").validate(length_of().max(10)))
            .register()
            .unwrap();
        store
            .model("Employee")
            .extends("Person")
            .field(FieldDescriptor::string("name").label("Full name"))
            .field(FieldDescriptor::string("title"))
            .register()
            .unwrap();
        store
    }

    #[test]
    fn merged_fields_equal_own_plus_ancestors() {
        let store = layered();
        let employee = store.resolve_model(&key("Employee")).unwrap();
        let names: Vec<_> = employee.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "title"]);
        assert_eq!(employee.field("name").unwrap().label, "Full name");
        assert_eq!(employee.parent(), Some(&key("Person")));
        assert_eq!(employee.schema().len(), 2);
    }

    #[test]
    fn subclass_resolution_leaves_parent_untouched() {
        let store = layered();
        let employee = store.resolve_model(&key("Employee")).unwrap();
        let person = store.resolve_model(&key("Person")).unwrap();
        let base = store.resolve_model(&key("Base")).unwrap();
        assert_eq!(base.fields().len(), 1);
        assert_eq!(person.fields().len(), 2);
        assert_eq!(employee.fields().len(), 3);
        assert_eq!(person.field("name").unwrap().label, "Name");
    }

    #[test]
    fn resolution_is_cached() {
        let store = layered();
        let first = store.resolve_model(&key("Person")).unwrap();
        let second = store.resolve_model(&key("Person")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn undecorated_class_is_missing_model() {
        let store = layered();
        let err = store.resolve_model(&key("Unknown")).unwrap_err();
        assert_eq!(err, DeclarationError::MissingModel { class: key("Unknown") });
        assert!(err.to_string().contains("Unknown"));
    }

    #[test]
    fn undecorated_subclass_inherits() {
        let store = layered();
        store.define_class(&key("Intern"), Some(&key("Person"))).unwrap();
        let intern = store.resolve_model(&key("Intern")).unwrap();
        assert_eq!(intern.fields().len(), 2);
        assert_eq!(intern.parent(), Some(&key("Person")));
    }

    #[test]
    fn resolved_classes_are_sealed() {
        let store = layered();
        store.resolve_model(&key("Employee")).unwrap();
        let err = store
            .define_field(&key("Base"), FieldDescriptor::string("late"))
            .unwrap_err();
        assert_eq!(err, DeclarationError::Sealed { class: key("Base") });
        let err = store
            .validation(&key("Employee"), |v| {
                v.check("title", length_of().max(3));
            })
            .unwrap_err();
        assert_eq!(err, DeclarationError::Sealed { class: key("Employee") });
    }

    #[test]
    fn validation_sees_inherited_fields() {
        let store = layered();
        store
            .validation(&key("Employee"), |v| {
                assert_eq!(v.fields(), ["id", "name", "title"]);
                v.check("id", length_of().max(3));
            })
            .unwrap();
        let err = store
            .validation(&key("Employee"), |v| {
                v.check("salary", length_of().max(3));
            })
            .unwrap_err();
        assert!(matches!(err, DeclarationError::UnknownValidationTarget { .. }));
    }

    #[test]
    fn labels_default_to_title_case() {
        let field = FieldDescriptor::string("passwordConfirmation");
        assert_eq!(field.label, "Password Confirmation");
        assert_eq!(field.lookup_key(), "passwordConfirmation");
        let field = FieldDescriptor::string("first_name").key("fname");
        assert_eq!(field.label, "First Name");
        assert_eq!(field.lookup_key(), "fname");
    }

    #[test]
    fn redefining_a_field_replaces_its_validators() {
        let store = MetadataStore::new();
        store
            .model("Account")
            .field(FieldDescriptor::string("email").required())
            .register()
            .unwrap();
        store
            .define_field(
                &key("Account"),
                FieldDescriptor::string("email").required().label("E-mail"),
            )
            .unwrap();
        let account = store.resolve_model(&key("Account")).unwrap();
        assert_eq!(account.schema().len(), 1);
        let mut model = crate::ModelInstance::new(account);
        assert_eq!(model.validate(), Ok(false));
        assert_eq!(model.errors().messages(), ["E-mail is required"]);
    }

    struct Trunk;

    impl Model for Trunk {
        fn class_key() -> ClassKey {
            key("Trunk")
        }

        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::int("id")]
        }
    }

    struct Leaf;

    impl Model for Leaf {
        fn class_key() -> ClassKey {
            key("Leaf")
        }

        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::string("value").required()]
        }
    }

    struct Wide;

    impl Model for Wide {
        fn class_key() -> ClassKey {
            key("Wide")
        }

        fn parent_key() -> Option<ClassKey> {
            Some(key("Trunk"))
        }

        fn fields() -> Vec<FieldDescriptor> {
            (0..8)
                .map(|i| FieldDescriptor::string(format!("f{i}")).required())
                .chain(std::iter::once(FieldDescriptor::model("leaf", "Leaf")))
                .collect()
        }

        fn declare_dependencies(declarer: &mut Declarer<'_>) -> Result<(), DeclarationError> {
            declarer.declare::<Trunk>()?;
            declarer.declare::<Leaf>()?;
            Ok(())
        }
    }

    #[test]
    fn concurrent_first_declarations_are_complete() {
        for _ in 0..200 {
            let store = MetadataStore::new();
            let barrier = std::sync::Barrier::new(4);
            let outcomes: Vec<_> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..4)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            let class = store.declare::<Wide>()?;
                            let wide = store.resolve_model(&class)?;
                            let leaf = store.resolve_model(&key("Leaf"))?;
                            Ok::<_, DeclarationError>((
                                wide.fields().len(),
                                wide.schema().len(),
                                leaf.fields().len(),
                            ))
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            for outcome in outcomes {
                assert_eq!(outcome, Ok((10, 8, 1)));
            }
        }
    }

    #[test]
    fn concurrent_resolution_is_idempotent() {
        let store = layered();
        let resolved: Vec<Arc<ModelMetadata>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| store.resolve_model(&key("Employee")).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for metadata in resolved.iter() {
            assert!(Arc::ptr_eq(metadata, &resolved[0]));
        }
        assert_eq!(store.resolve_model(&key("Base")).unwrap().fields().len(), 1);
    }
}
