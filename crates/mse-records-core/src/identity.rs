//! Record and patient identifiers.
//!
//! Record IDs are derived from the patient's name, age and sex so the same
//! person at the same age always maps to the same record. Patient IDs are
//! generated tokens and share nothing with the record scheme.

/// Length of the random suffix on patient IDs.
const PATIENT_SUFFIX_LEN: u32 = 5;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Derive a record identifier from name, age and sex.
///
/// Returns `None` when any input is empty (or only whitespace). The result is
/// `STEM + AGE + SEX_INITIAL`:
///
/// - multi-word names use the first letter of the first and last words,
/// - single-word names use their first two characters (or one, if that is all
///   there is),
/// - the age is appended verbatim.
///
/// ```
/// use mse_records_core::identity::derive_record_id;
///
/// assert_eq!(derive_record_id("John Doe", "34", "Male").as_deref(), Some("JD34M"));
/// assert_eq!(derive_record_id("Madonna", "27", "Female").as_deref(), Some("MA27F"));
/// assert_eq!(derive_record_id("", "34", "Male"), None);
/// ```
pub fn derive_record_id(name: &str, age: &str, sex: &str) -> Option<String> {
    if age.trim().is_empty() || sex.trim().is_empty() {
        return None;
    }

    let tokens: Vec<&str> = name.split_whitespace().collect();
    let stem: String = match tokens.as_slice() {
        [] => return None,
        [only] => only.chars().take(2).collect(),
        [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
    };

    let sex_initial = sex.chars().next()?;

    let mut id = stem.to_uppercase();
    id.push_str(age);
    id.extend(sex_initial.to_uppercase());
    Some(id)
}

/// Generate a fresh patient identifier.
///
/// Format: `PAT-` + base36 epoch milliseconds + five random base36 characters
/// (uppercase). Collisions are not checked.
pub fn generate_patient_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u128;
    let modulus = 36u128.pow(PATIENT_SUFFIX_LEN);
    let random = uuid::Uuid::new_v4().as_u128() % modulus;

    format!(
        "PAT-{}{}",
        to_base36(millis),
        pad_base36(random, PATIENT_SUFFIX_LEN as usize).to_uppercase()
    )
}

/// Encode a number in lowercase base36.
pub fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

fn pad_base36(value: u128, width: usize) -> String {
    format!("{:0>width$}", to_base36(value), width = width)
}
