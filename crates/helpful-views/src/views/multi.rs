//! Views that create or edit several objects from one submission.
//!
//! A view lists named [`FormSlot`]s. Each slot becomes one form, prefixed
//! with the slot name so the inputs of different forms never collide. The
//! forms are validated together and saved only when all of them are valid.
//!
//! ## Key Types
//!
//! - [`MultipleObjectCreateView`] - Builds blank forms; the view decides how
//!   to persist them
//! - [`MultiObjectUpdateView`] - Binds the forms to existing objects and
//!   saves them
//! - [`SlotMap`] - Slot name to object, in insertion order

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use helpful_core::{HelpfulError, HelpfulResult, ModelFormBase};
use helpful_db::{Instance, ModelMeta};
use helpful_forms::{
    all_valid, construct_form_layout, get_flat_fields, modelform_factory, FieldLayout, Form,
    FormClass, FormHelper, FormKwargs,
};
use helpful_http::{HttpRequest, HttpResponse, HttpResponseRedirect, TemplateContext};

use super::class_based::{error_response, ContextMixin, TemplateResponseMixin, View};

/// Where a slot's form class comes from.
#[derive(Clone)]
pub enum FormSource {
    /// A model form generated from a field layout spec.
    Fields(Vec<FieldLayout>),
    /// An explicit form class.
    Class(Arc<dyn FormClass>),
}

impl fmt::Debug for FormSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Self::Class(_) => f.write_str("Class(..)"),
        }
    }
}

/// One named form of a multi-object view.
#[derive(Debug, Clone)]
pub struct FormSlot {
    /// The slot name, also used as the form prefix.
    pub name: String,
    /// The model edited through this slot.
    pub model: &'static ModelMeta,
    /// The form class source.
    pub source: FormSource,
}

impl FormSlot {
    /// A slot whose model form is generated from a field layout spec.
    pub fn fields(name: impl Into<String>, model: &'static ModelMeta, fields: Vec<FieldLayout>) -> Self {
        Self {
            name: name.into(),
            model,
            source: FormSource::Fields(fields),
        }
    }

    /// A slot with an explicit form class.
    pub fn class(name: impl Into<String>, model: &'static ModelMeta, class: Arc<dyn FormClass>) -> Self {
        Self {
            name: name.into(),
            model,
            source: FormSource::Class(class),
        }
    }
}

/// Slot names mapped to objects, in insertion order.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
///
/// use helpful_db::{Instance, ModelMeta};
/// use helpful_views::SlotMap;
///
/// static NOTE: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta::new("notes", "note"));
///
/// let mut objects = SlotMap::new();
/// objects.insert("second", Instance::new(&NOTE));
/// objects.insert("first", Instance::new(&NOTE));
/// assert_eq!(objects.names(), vec!["second", "first"]);
/// assert!(objects.contains("first"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SlotMap {
    entries: Vec<(String, Instance)>,
}

impl SlotMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the object for `name`, keeping its position if already present.
    pub fn insert(&mut self, name: impl Into<String>, object: Instance) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = object,
            None => self.entries.push((name, object)),
        }
    }

    /// Returns the object for `name`.
    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    /// Returns `true` if `name` has an object.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.entries.iter().map(|(n, o)| (n.as_str(), o))
    }

    /// Returns the slot names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// Form construction, rendering and redirects shared by the multi-object
/// views.
pub trait MultiFormMixin: View + ContextMixin + TemplateResponseMixin {
    /// The slots, in display order.
    fn slots(&self) -> &[FormSlot];

    /// An explicit redirect target.
    fn success_url(&self) -> Option<&str> {
        None
    }

    /// The base for generated model forms. Defaults to the settings.
    fn model_form_base(&self) -> ModelFormBase {
        self.services().settings.model_form_base
    }

    /// Generates a model form class with a grid layout from a spec.
    fn construct_form_class(
        &self,
        model: &'static ModelMeta,
        fields: &[FieldLayout],
    ) -> HelpfulResult<Arc<dyn FormClass>> {
        let flat = get_flat_fields(Some(fields)).unwrap_or_default();
        let helper = FormHelper::new()
            .with_layout(construct_form_layout(fields)?)
            .with_form_tag(false);
        let class = modelform_factory(model, &flat, &flat, self.model_form_base())?.with_helper(helper);
        Ok(Arc::new(class))
    }

    /// Form kwargs for slot `name`. Forms are bound only when the request
    /// body carries data.
    fn get_form_kwargs(&self, request: &HttpRequest, name: &str) -> FormKwargs {
        let data = (!request.post().is_empty()).then(|| request.post().clone());
        FormKwargs::new().prefix(name).data(data)
    }

    /// Builds one form per slot. With `objects`, each form edits the
    /// slot's object.
    fn get_forms(
        &self,
        request: &HttpRequest,
        objects: Option<&SlotMap>,
    ) -> HelpfulResult<Vec<Box<dyn Form>>> {
        let slots = self.slots();
        if slots.is_empty() {
            return Err(HelpfulError::ImproperlyConfigured(
                "You need to specify the models".to_string(),
            ));
        }
        let mut forms = Vec::with_capacity(slots.len());
        for slot in slots {
            let class = match &slot.source {
                FormSource::Class(class) => Arc::clone(class),
                FormSource::Fields(fields) => self.construct_form_class(slot.model, fields)?,
            };
            let mut kwargs = self.get_form_kwargs(request, &slot.name);
            if let Some(objects) = objects {
                let object = objects.get(&slot.name).ok_or_else(|| {
                    HelpfulError::ImproperlyConfigured(format!(
                        "get_objects returned no object for '{}'",
                        slot.name
                    ))
                })?;
                kwargs = kwargs.instance(object.clone());
            }
            forms.push(class.construct(kwargs));
        }
        tracing::debug!(forms = forms.len(), "Built slot forms");
        Ok(forms)
    }

    /// Renders the forms under `forms`, next to the URL keyword arguments.
    fn render_forms(&self, request: &HttpRequest, forms: &[Box<dyn Form>]) -> HttpResponse {
        let mut context = TemplateContext::new();
        for (key, value) in request.kwargs() {
            context.insert(key.clone(), value.clone().into());
        }
        let forms: Vec<serde_json::Value> = forms.iter().map(|f| f.as_context()).collect();
        context.insert("forms".to_string(), forms.into());
        self.render_to_response("", self.get_context_data(context))
    }

    /// Returns the redirect target: `success_url`, else the canonical URL
    /// of the first slot (in slot order) whose object has one.
    fn get_success_url(&self, objects: &SlotMap) -> HelpfulResult<String> {
        if let Some(url) = self.success_url() {
            return Ok(url.to_string());
        }
        if objects.is_empty() {
            return Err(HelpfulError::ImproperlyConfigured(
                "Your forms_valid method should set the objects".to_string(),
            ));
        }
        self.slots()
            .iter()
            .filter_map(|slot| objects.get(&slot.name))
            .find_map(Instance::get_absolute_url)
            .ok_or_else(|| {
                HelpfulError::ImproperlyConfigured(
                    "No URL to redirect to. Provide a success_url.".to_string(),
                )
            })
    }
}

/// Creates several objects from one submission.
///
/// GET renders every slot's form unbound. POST binds them all; if every
/// form is valid, [`MultipleObjectCreateView::forms_valid`] persists them,
/// otherwise all forms are re-rendered with their data and errors.
#[async_trait]
pub trait MultipleObjectCreateView: MultiFormMixin {
    /// Persists the valid forms, records each saved object in `objects`
    /// under its slot name and returns the response (usually a redirect to
    /// [`MultiFormMixin::get_success_url`]).
    async fn forms_valid(
        &self,
        request: &HttpRequest,
        forms: Vec<Box<dyn Form>>,
        objects: &mut SlotMap,
    ) -> HelpfulResult<HttpResponse>;

    /// Re-renders the forms with their errors.
    async fn forms_invalid(&self, request: &HttpRequest, forms: Vec<Box<dyn Form>>) -> HttpResponse {
        self.render_forms(request, &forms)
    }

    /// Builds, validates and dispatches the forms.
    async fn process_forms(&self, request: &HttpRequest) -> HelpfulResult<HttpResponse> {
        let mut forms = self.get_forms(request, None)?;
        if *request.method() != http::Method::POST {
            return Ok(self.render_forms(request, &forms));
        }
        if all_valid(&mut forms).await {
            let mut objects = SlotMap::new();
            let response = self.forms_valid(request, forms, &mut objects).await?;
            tracing::info!(objects = ?objects.names(), "Created slot objects");
            return Ok(response);
        }
        tracing::debug!("At least one slot form is invalid");
        Ok(self.forms_invalid(request, forms).await)
    }

    /// Handles GET and POST.
    async fn handle_forms(&self, request: HttpRequest) -> HttpResponse {
        self.process_forms(&request)
            .await
            .unwrap_or_else(|e| error_response(&e))
    }
}

/// Edits several existing objects from one submission.
///
/// The objects are resolved by [`MultiObjectUpdateView::get_objects`] on
/// every request, before the forms are built.
#[async_trait]
pub trait MultiObjectUpdateView: MultiFormMixin {
    /// Returns the object for every slot.
    async fn get_objects(&self, request: &HttpRequest) -> HelpfulResult<SlotMap>;

    /// Saves every form and redirects.
    async fn forms_valid(
        &self,
        _request: &HttpRequest,
        mut forms: Vec<Box<dyn Form>>,
        objects: &mut SlotMap,
    ) -> HelpfulResult<HttpResponse> {
        let store = self.services().store.as_ref();
        for (slot, form) in self.slots().iter().zip(forms.iter_mut()) {
            let saved = form.save(store).await?;
            objects.insert(slot.name.clone(), saved);
        }
        Ok(HttpResponseRedirect::new(&self.get_success_url(objects)?))
    }

    /// Re-renders the forms with their errors.
    async fn forms_invalid(&self, request: &HttpRequest, forms: Vec<Box<dyn Form>>) -> HttpResponse {
        self.render_forms(request, &forms)
    }

    /// Resolves the objects, then builds, validates and dispatches the
    /// forms.
    async fn process_forms(&self, request: &HttpRequest) -> HelpfulResult<HttpResponse> {
        let mut objects = self.get_objects(request).await?;
        let mut forms = self.get_forms(request, Some(&objects))?;
        if *request.method() != http::Method::POST {
            return Ok(self.render_forms(request, &forms));
        }
        if all_valid(&mut forms).await {
            let response = self.forms_valid(request, forms, &mut objects).await?;
            tracing::info!(objects = ?objects.names(), "Updated slot objects");
            return Ok(response);
        }
        tracing::debug!("At least one slot form is invalid");
        Ok(self.forms_invalid(request, forms).await)
    }

    /// Handles GET and POST.
    async fn handle_forms(&self, request: HttpRequest) -> HttpResponse {
        self.process_forms(&request)
            .await
            .unwrap_or_else(|e| error_response(&e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use helpful_db::{FieldDef, FieldType, MemoryStore};
    use helpful_forms::field_layout;

    use super::*;
    use crate::services::ViewServices;
    use crate::views::class_based::ModelMixin;

    static CAT: LazyLock<ModelMeta> = LazyLock::new(|| {
        ModelMeta::new("pets", "cat")
            .field(FieldDef::new("name", FieldType::CharField { max_length: 20 }))
            .absolute_url(|c| format!("/cats/{}/", c.pk().unwrap_or_default()))
    });

    static COLLAR: LazyLock<ModelMeta> = LazyLock::new(|| {
        ModelMeta::new("pets", "collar")
            .field(FieldDef::new("color", FieldType::CharField { max_length: 20 }))
    });

    struct Pets {
        services: ViewServices,
        slots: Vec<FormSlot>,
        success_url: Option<&'static str>,
    }

    impl Pets {
        fn new(slots: Vec<FormSlot>) -> Self {
            Self {
                services: ViewServices::new(Arc::new(MemoryStore::new(vec![&CAT, &COLLAR]))),
                slots,
                success_url: None,
            }
        }
    }

    impl ModelMixin for Pets {
        fn services(&self) -> &ViewServices {
            &self.services
        }
    }

    impl ContextMixin for Pets {}

    impl TemplateResponseMixin for Pets {
        fn template_name(&self) -> Option<&str> {
            Some("pets/multi.html")
        }
    }

    #[async_trait]
    impl View for Pets {}

    impl MultiFormMixin for Pets {
        fn slots(&self) -> &[FormSlot] {
            &self.slots
        }

        fn success_url(&self) -> Option<&str> {
            self.success_url
        }
    }

    fn both() -> Vec<FormSlot> {
        vec![
            FormSlot::fields("collar", &COLLAR, field_layout!["color"]),
            FormSlot::fields("cat", &CAT, field_layout!["name"]),
        ]
    }

    fn saved(meta: &'static ModelMeta, pk: i64) -> Instance {
        let mut obj = Instance::new(meta);
        obj.set_pk(pk);
        obj
    }

    #[test]
    fn test_slot_map_insert_keeps_position() {
        let mut objects = SlotMap::new();
        objects.insert("a", saved(&CAT, 1));
        objects.insert("b", saved(&CAT, 2));
        objects.insert("a", saved(&CAT, 3));
        assert_eq!(objects.names(), vec!["a", "b"]);
        assert_eq!(objects.get("a").unwrap().pk(), Some(3));
        assert_eq!(objects.len(), 2);
        assert!(!objects.contains("c"));
    }

    #[test]
    fn test_no_slots_is_configuration_error() {
        let view = Pets::new(Vec::new());
        let err = view.get_forms(&HttpRequest::builder().build(), None).err().unwrap();
        assert_eq!(err.to_string(), "Improperly configured: You need to specify the models");
    }

    #[test]
    fn test_forms_prefixed_by_slot_name() {
        let view = Pets::new(both());
        let forms = view.get_forms(&HttpRequest::builder().build(), None).unwrap();
        let prefixes: Vec<_> = forms.iter().map(|f| f.prefix().map(str::to_string)).collect();
        assert_eq!(prefixes, vec![Some("collar".to_string()), Some("cat".to_string())]);
        assert!(forms.iter().all(|f| !f.is_bound()));
        assert!(!forms[0].helper().unwrap().form_tag);
    }

    #[test]
    fn test_missing_slot_object() {
        let view = Pets::new(both());
        let mut objects = SlotMap::new();
        objects.insert("cat", saved(&CAT, 1));
        let err = view
            .get_forms(&HttpRequest::builder().build(), Some(&objects))
            .err()
            .unwrap();
        assert!(err.to_string().contains("'collar'"));
    }

    #[test]
    fn test_success_url_resolution() {
        let mut view = Pets::new(both());
        let err = view.get_success_url(&SlotMap::new()).unwrap_err();
        assert!(err.to_string().contains("should set the objects"));

        let mut objects = SlotMap::new();
        objects.insert("collar", saved(&COLLAR, 5));
        let err = view.get_success_url(&objects).unwrap_err();
        assert!(err.to_string().contains("Provide a success_url"));

        objects.insert("cat", saved(&CAT, 2));
        assert_eq!(view.get_success_url(&objects).unwrap(), "/cats/2/");

        view.success_url = Some("/done/");
        assert_eq!(view.get_success_url(&SlotMap::new()).unwrap(), "/done/");
    }

    #[test]
    fn test_render_forms_exposes_kwargs() {
        let view = Pets::new(both());
        let request = HttpRequest::builder().kwarg("owner", "7").build();
        let forms = view.get_forms(&request, None).unwrap();
        let response = view.render_forms(&request, &forms);
        assert_eq!(response.template_names(), ["pets/multi.html"]);
        assert_eq!(response.context_value("owner").unwrap(), "7");
        assert_eq!(response.context_value("forms").unwrap().as_array().unwrap().len(), 2);
    }
}
