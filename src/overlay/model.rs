//! Overlay model: settings snapshot -> typed slot descriptors and settings view

use sensor_overlay_core::SettingsStore;
use sensor_overlay_types::{
    Capability, OverlayField, OverlayId, OverlayKind, OverlaySlot, SettingField,
    SettingFieldType, DEFAULT_MAX_DECIMALS, DEFAULT_TEMPLATE,
};

/// Read a setting, treating an empty string the same as unset
fn read(settings: &dyn SettingsStore, overlay_id: &OverlayId, field: OverlayField) -> Option<String> {
    settings
        .get(&overlay_id.key(field))
        .filter(|value| !value.is_empty())
}

fn parse_max_decimals(raw: Option<String>, overlay_id: &OverlayId) -> u32 {
    match raw {
        None => DEFAULT_MAX_DECIMALS,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!(
                "Overlay {}: invalid maxDecimals {:?}, using {}",
                overlay_id,
                raw,
                DEFAULT_MAX_DECIMALS
            );
            DEFAULT_MAX_DECIMALS
        }),
    }
}

/// Build the typed descriptor for one slot from the current settings.
///
/// Never fails: missing values take their defaults, and a missing device
/// leaves `bound_device_id` empty for the reconciler to skip.
pub fn resolve_slot(settings: &dyn SettingsStore, overlay_id: &OverlayId) -> OverlaySlot {
    let kind = read(settings, overlay_id, OverlayField::Type)
        .map(|raw| OverlayKind::from_storage(&raw))
        .unwrap_or_default();

    OverlaySlot {
        id: overlay_id.clone(),
        kind,
        template: read(settings, overlay_id, OverlayField::Template)
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
        static_text: settings
            .get(&overlay_id.key(OverlayField::Text))
            .unwrap_or_default(),
        bound_device_id: read(settings, overlay_id, OverlayField::Device),
        max_decimals: parse_max_decimals(
            read(settings, overlay_id, OverlayField::MaxDecimals),
            overlay_id,
        ),
    }
}

fn type_field(slot: &OverlaySlot) -> SettingField {
    SettingField::new(
        slot.id.key(OverlayField::Type),
        "Overlay Type",
        "Where the overlay text comes from",
        SettingFieldType::Choice(
            OverlayKind::ALL
                .iter()
                .map(|kind| kind.storage_name().to_string())
                .collect(),
        ),
        Some(slot.kind.storage_name().to_string()),
    )
}

fn template_field(slot: &OverlaySlot) -> SettingField {
    SettingField::new(
        slot.id.key(OverlayField::Template),
        "Value Template",
        "Text to show; ${value} and ${unit} are replaced with the reading",
        SettingFieldType::Text,
        Some(slot.template.clone()),
    )
}

/// Editable settings for every slot, in slot order.
///
/// The type selector is always present; the remaining fields depend on the
/// currently selected kind. Pure function of the settings snapshot.
pub fn build_settings_view(settings: &dyn SettingsStore, overlay_ids: &[OverlayId]) -> Vec<SettingField> {
    let mut fields = Vec::new();

    for overlay_id in overlay_ids {
        let slot = resolve_slot(settings, overlay_id);
        fields.push(type_field(&slot));

        match slot.kind {
            OverlayKind::StaticText => {
                fields.push(SettingField::new(
                    overlay_id.key(OverlayField::Text),
                    "Text",
                    "Static text to show",
                    SettingFieldType::Text,
                    Some(slot.static_text.clone()),
                ));
            }
            OverlayKind::BoundDevice => {
                fields.push(SettingField::new(
                    overlay_id.key(OverlayField::Device),
                    "Sensor",
                    "Temperature or humidity sensor feeding this overlay",
                    SettingFieldType::Device(vec![
                        Capability::Thermometer,
                        Capability::HumiditySensor,
                    ]),
                    slot.bound_device_id.clone(),
                ));
                fields.push(template_field(&slot));
                fields.push(SettingField::new(
                    overlay_id.key(OverlayField::MaxDecimals),
                    "Max Decimals",
                    "Fractional digits shown for the reading",
                    SettingFieldType::Number,
                    Some(slot.max_decimals.to_string()),
                ));
            }
            OverlayKind::FaceDetection => {
                fields.push(template_field(&slot));
            }
        }
    }

    fields
}
