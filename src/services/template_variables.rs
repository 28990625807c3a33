//! services/template_variables.rs
//! Sustitución de variables `{{clave}}` en el contenido de una plantilla.

use std::collections::BTreeMap;

/// Reemplaza cada `{{clave}}` por su valor (global, sensible a mayúsculas).
/// Los placeholders sin variable quedan tal cual.
pub fn apply(content: &str, variables: &BTreeMap<String, String>) -> String {
    let mut rendered = content.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, value);
        }
    }
    rendered
}
