//! Form adapter contract and the form operations built on it.
//!
//! The host UI implements [`FormAdapter`] over whatever widgets it renders;
//! the functions here decide which keys are read, written or reset using the
//! shared [`FormSchema`].

use crate::models::{FieldValue, Fields, Record};
use crate::schema::{FieldKind, FormSchema};

/// Read/write access to the fields a form currently shows.
pub trait FormAdapter {
    /// Whether the form has an input for this key.
    fn has_field(&self, key: &str) -> bool;

    /// Current value of an input, `None` if the form has no such input.
    fn read(&self, key: &str) -> Option<FieldValue>;

    /// Set an input's value. Unknown keys are ignored.
    fn write(&mut self, key: &str, value: &FieldValue);
}

/// Gather the values of every schema field present on the form.
pub fn collect_fields<F: FormAdapter + ?Sized>(schema: &FormSchema, form: &F) -> Fields {
    schema
        .keys()
        .filter_map(|key| form.read(key).map(|value| (key.to_string(), value)))
        .collect()
}

/// Fill the form from a saved record. Returns the number of inputs written.
pub fn populate_form<F: FormAdapter + ?Sized>(record: &Record, form: &mut F) -> usize {
    let mut written = 0;
    for (key, value) in &record.fields {
        if form.has_field(key) {
            form.write(key, value);
            written += 1;
        }
    }
    written
}

/// Reset every schema field on the form except the `preserve` keys.
///
/// Flags become unchecked, everything else empty text.
pub fn clear_form<F: FormAdapter + ?Sized>(schema: &FormSchema, form: &mut F, preserve: &[&str]) {
    for field in schema.fields() {
        if preserve.contains(&field.key.as_str()) || !form.has_field(&field.key) {
            continue;
        }

        let blank = match field.kind {
            FieldKind::Flag => FieldValue::Flag(false),
            FieldKind::Text | FieldKind::LongText | FieldKind::Date => {
                FieldValue::Text(String::new())
            }
        };
        form.write(&field.key, &blank);
    }
}
