// src/splitter.rs

use crate::models::{Payload, Sections};
use serde_json::Value;

/// Header that opens the kernel ring-buffer section.
pub const DMESG_DELIMITER: &str = "dmesg\n-----";

/// Header that opens the per-application section.
pub const APPS_DELIMITER: &str = "App logs\n--------";

/// Banner that closes the app logs; it and everything after it belong to `main`.
pub const RESULT_BANNER: &str = "================\n==== Result ====\n================";

/// Stored as `apps` when a dump has no app-log section.
pub const LEGACY_APPS_PLACEHOLDER: &str =
    "This upload was made with an outdated version, so app logs aren't available.";

/// Splits a raw log dump into its sections.
///
/// Every delimiter is matched at its first occurrence. A dump that quotes one of the
/// headers inside its own content will be split there; that is accepted.
pub fn split_content(content: &str) -> Sections {
    let Some((before_dmesg, dmesg_section)) = content.split_once(DMESG_DELIMITER) else {
        tracing::debug!("no dmesg section, storing dump as main");
        return Sections {
            main: content.to_string(),
            dmesg: String::new(),
            apps: Some(LEGACY_APPS_PLACEHOLDER.to_string()),
        };
    };

    let dmesg = dmesg_section.trim().to_string();

    let Some((before_apps, apps_section)) = before_dmesg.split_once(APPS_DELIMITER) else {
        tracing::debug!("no app logs section");
        return Sections {
            main: before_dmesg.trim().to_string(),
            dmesg,
            apps: Some(LEGACY_APPS_PLACEHOLDER.to_string()),
        };
    };

    let main = before_apps.trim();
    match apps_section.split_once(RESULT_BANNER) {
        Some((apps, result)) => Sections {
            main: format!("{}\n\n{}{}", main, RESULT_BANNER, result),
            dmesg,
            apps: Some(apps.trim().to_string()),
        },
        None => Sections {
            main: main.to_string(),
            dmesg,
            apps: Some(apps_section.trim().to_string()),
        },
    }
}

/// Turns whatever was submitted into the sections to store.
pub fn normalize(payload: Payload) -> Sections {
    match payload {
        Payload::Raw(text) => split_content(&text),
        Payload::Structured(Value::String(text)) => split_content(&text),
        Payload::Structured(value) => match structured_sections(&value) {
            Some(sections) => sections,
            None => {
                tracing::debug!("unrecognized payload shape, storing it serialized");
                Sections {
                    main: value.to_string(),
                    dmesg: String::new(),
                    apps: None,
                }
            }
        },
    }
}

/// Pre-split uploads carry all three sections as strings and are kept verbatim.
fn structured_sections(value: &Value) -> Option<Sections> {
    let object = value.as_object()?;
    let field = |name: &str| object.get(name).and_then(Value::as_str).map(str::to_string);
    Some(Sections {
        main: field("main")?,
        dmesg: field("dmesg")?,
        apps: Some(field("apps")?),
    })
}
