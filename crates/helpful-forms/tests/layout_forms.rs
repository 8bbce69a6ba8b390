//! Field layout specs driving generated model forms and formsets.

use std::sync::LazyLock;

use helpful_core::ModelFormBase;
use helpful_db::{FieldDef, FieldType, MemoryStore, ModelMeta, ObjectStore};
use helpful_forms::{
    construct_form_layout, field_layout, get_flat_fields, modelform_factory, Form, FormClass,
    FormHelper, FormKwargs, FormSet,
};
use helpful_http::QueryDict;

static CONTACT: LazyLock<ModelMeta> = LazyLock::new(|| {
    ModelMeta::new("crm", "contact")
        .field(FieldDef::new("first_name", FieldType::CharField { max_length: 50 }))
        .field(FieldDef::new("last_name", FieldType::CharField { max_length: 50 }))
        .field(FieldDef::new("email", FieldType::EmailField))
        .field(FieldDef::new("notes", FieldType::TextField).blank())
});

#[tokio::test]
async fn layout_spec_drives_fields_and_grid() {
    let spec = field_layout![[["first_name"], ["last_name"]], "email", "notes"];
    let fields = get_flat_fields(Some(&spec)).unwrap();
    assert_eq!(fields, vec!["first_name", "last_name", "email", "notes"]);

    let helper = FormHelper::new()
        .with_form_tag(false)
        .with_layout(construct_form_layout(&spec).unwrap());
    let class = modelform_factory(&CONTACT, &fields, &[], ModelFormBase::Plain)
        .unwrap()
        .with_helper(helper);

    let form = class.construct(FormKwargs::new());
    let html = form.as_context()["html"].as_str().unwrap().to_string();
    assert!(html.starts_with("<div class=\"row\"><div class=\"col-sm-6\">"));
    assert!(html.contains("<div class=\"col-sm-12\">"));
    assert!(!html.contains("<form"));
    let first = html.find("first_name").unwrap();
    let notes = html.find("notes").unwrap();
    assert!(first < notes);
}

#[tokio::test]
async fn delete_checkbox_is_not_a_model_field() {
    let spec = field_layout![[["first_name"], ["DELETE"]]];
    let fields = get_flat_fields(Some(&spec)).unwrap();
    assert!(modelform_factory(&CONTACT, &fields, &[], ModelFormBase::Plain).is_ok());
}

#[tokio::test]
async fn formset_of_model_forms_saves_rows() {
    let store = MemoryStore::new(vec![&CONTACT]);
    let class = modelform_factory(
        &CONTACT,
        &["first_name".to_string(), "email".to_string()],
        &[],
        ModelFormBase::Plain,
    )
    .unwrap();

    let data = QueryDict::parse(
        "contact-TOTAL_FORMS=2&contact-INITIAL_FORMS=0\
         &contact-0-first_name=Ada&contact-0-email=ada%40example.com\
         &contact-1-first_name=Alan&contact-1-email=alan%40example.com",
    );
    let mut formset = FormSet::new(&class, "contact", Some(&data), Vec::new(), 0);
    assert!(formset.is_valid().await);
    let saved = formset.save(&store).await.unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(store.all(&CONTACT).await.unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_email_reported_per_form() {
    let class = modelform_factory(
        &CONTACT,
        &["first_name".to_string(), "email".to_string()],
        &[],
        ModelFormBase::Plain,
    )
    .unwrap();
    let mut form = class.construct(
        FormKwargs::new()
            .prefix("c")
            .data(Some(QueryDict::parse("c-first_name=Ada&c-email=nope"))),
    );
    assert!(!form.is_valid().await);
    assert_eq!(
        form.errors().as_text(),
        "* email\n  * Enter a valid email address."
    );
}
