//! Field Decode Router
//!
//! Every coded field stored in proposal records is routed here to its
//! human-readable label. Lookup key is the exact field name; the same code
//! means different things under different fields, so there is no global
//! code table. Decoding happens exactly once, at ingestion.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

// ============================================================================
// Code maps
// ============================================================================

/// A code -> label table for one family of fields. `classification` marks the
/// business identity maps whose unknown numeric codes render as
/// `Unknown (<code>)` instead of the raw number.
#[derive(Debug)]
pub struct CodeMap {
    pub entries: &'static [(&'static str, &'static str)],
    pub classification: bool,
}

impl CodeMap {
    const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            entries,
            classification: false,
        }
    }

    const fn classification(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            entries,
            classification: true,
        }
    }

    fn get(&self, code: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }
}

// Handles "001"/"002", "1"/"2" and boolean formats.
static YES_NO: CodeMap = CodeMap::new(&[
    ("001", "Yes"),
    ("002", "No"),
    ("1", "Yes"),
    ("2", "No"),
    ("true", "Yes"),
    ("false", "No"),
]);

static INDUSTRY: CodeMap = CodeMap::classification(&[
    ("1", "Jewellery & Gold"),
    ("2", "Diamond & Precious Stones"),
    ("6", "Money Services"),
    ("7", "Luxury Watches"),
    ("13", "Pawnbrokers"),
]);

static BUSINESS_TYPE: CodeMap = CodeMap::classification(&[
    ("1", "Jewellery Retailer"),
    ("2", "Jewellery & Gold Manufacturer"),
    ("3", "Jewellery & Gold Wholesaler"),
    ("5", "Jewellery & Gold Bullion Distributor"),
    ("8", "Diamond Dealers"),
    ("10", "Money Changer"),
    ("11", "Remittance Services"),
    ("12", "Luxury Good Retailer"),
    ("13", "Luxury Watch Retailer"),
    ("34", "Pawnbrokers"),
    ("35", "Precious Stones Dealers"),
]);

static PREMISE_TYPE: CodeMap = CodeMap::new(&[
    ("001", "Office building"),
    ("002", "Shopping centre"),
    ("003", "Shop house"),
    ("004", "Others"),
]);

// roof_materials, wall_materials, floor_materials
static MATERIAL: CodeMap = CodeMap::new(&[
    ("001", "Concrete"),
    ("002", "Tiled"),
    ("003", "Metal"),
    ("004", "Wood"),
]);

static CCTV_BACKUP: CodeMap = CodeMap::new(&[
    ("001", "Real-time backup - remote"),
    ("002", "Real-time backup - on site only"),
    ("003", "Periodic backup - remote"),
    ("004", "Periodic backup - onsite"),
    ("005", "No backup"),
    ("006", "Others"),
]);

static CCTV_CAPABILITY: CodeMap = CodeMap::new(&[
    ("001", "Motion detection"),
    ("002", "Night vision"),
    ("003", "Others"),
]);

static CCTV_RETENTION: CodeMap = CodeMap::new(&[
    ("001", "1 week"),
    ("002", "2 weeks"),
    ("003", "3 weeks"),
    ("004", "1 month"),
    ("005", "3 months"),
    ("006", "6 months"),
    ("007", "9 months"),
    ("008", "1 year"),
    ("009", "More than 1 year"),
]);

static DOOR_ACCESS: CodeMap = CodeMap::new(&[
    ("001", "Combinations"),
    ("002", "Finger print"),
    ("003", "Facial"),
    ("004", "Digital password"),
    ("005", "Key only"),
    ("006", "Others"),
]);

// main_door_details, inner_door_details
static DOOR_MATERIAL: CodeMap = CodeMap::new(&[
    ("001", "Steel"),
    ("002", "Wooden"),
    ("003", "Glass"),
    ("004", "Others"),
]);

static REAR_DOOR: CodeMap = CodeMap::new(&[
    ("001", "Steel"),
    ("002", "Wooden"),
    ("003", "Others"),
]);

static ROLLER_SHUTTER: CodeMap = CodeMap::new(&[
    ("001", "Roller shutter"),
    ("002", "Iron grill"),
    ("003", "Others"),
]);

static ALARM_CONNECTION: CodeMap = CodeMap::new(&[
    ("001", "Security company"),
    ("002", "Landlord security"),
    ("003", "Police"),
    ("004", "Senior management"),
]);

static ALARM_TYPE: CodeMap = CodeMap::new(&[
    ("001", "Door contacts"),
    ("002", "Roller shutter contacts"),
    ("003", "Infra-red beams"),
    ("004", "Ultrasonic detector"),
    ("005", "Motion detector"),
    ("006", "Seismic detector"),
    ("007", "Glass sensors"),
    ("008", "Portable panic button"),
    ("009", "Fixed type panic button"),
    ("010", "Others"),
]);

static SAFE_GRADE: CodeMap = CodeMap::new(&[
    ("001", "Ungraded"),
    ("002", "Grade I"),
    ("003", "Grade II"),
    ("004", "Grade III"),
    ("005", "Grade IV"),
    ("006", "Grade V"),
    ("007", "Grade VI"),
    ("008", "Grade VII"),
]);

static KEY_COMBINATION: CodeMap = CodeMap::new(&[
    ("001", "Key"),
    ("002", "Combination code"),
    ("003", "Both"),
]);

// wall_showcase_thickness, display_window_thickness, rear_display_window_thickness
static SHOWCASE_THICKNESS: CodeMap = CodeMap::new(&[
    ("001", "21 mm"),
    ("002", "17-19 mm"),
    ("003", "15 mm"),
    ("004", "11-13 mm"),
    ("005", "9-10 mm"),
    ("006", "Others"),
]);

static SHOWCASE_PROTECTION: CodeMap = CodeMap::new(&[
    ("001", "Security glass"),
    ("002", "Laminated glass"),
    ("003", "Others"),
]);

static COUNTER_THICKNESS: CodeMap = CodeMap::new(&[
    ("001", "19-21 mm"),
    ("002", "15-17 mm"),
    ("003", "12-14 mm"),
    ("004", "10-11 mm"),
    ("005", "6-9 mm"),
    ("006", "Others"),
]);

static COUNTER_PROTECTION: CodeMap = CodeMap::new(&[
    ("001", "External vertical iron grilles and security glass"),
    ("002", "External vertical iron grilles and laminated glass"),
    ("003", "Internal lateral iron grilles and security glass"),
    ("004", "Internal lateral iron grilles and laminated"),
    ("005", "Security glass"),
    ("006", "Laminated glass"),
]);

static DW_COUNTER_PROTECTION: CodeMap = CodeMap::new(&[
    ("001", "External vertical iron grilles and security glass"),
    ("002", "External vertical iron grilles and laminated glass"),
    ("003", "Internal lateral iron grilles and security glass"),
    ("004", "Internal lateral iron grilles and laminated"),
    ("005", "Security glass"),
    ("006", "Laminated glass"),
    ("007", "Others"),
]);

static REAR_COUNTER_PROTECTION: CodeMap = CodeMap::new(&[
    ("001", "Iron grilles"),
    ("002", "Drawer with keylocks"),
    ("003", "Wooden flaps with keylocks"),
    ("004", "Wooden flaps with latch locks"),
    ("005", "Others"),
]);

static POLICE_DISTANCE: CodeMap = CodeMap::new(&[
    ("001", "Less than 2 Km"),
    ("002", "Within 2-5 Kms"),
    ("003", "5-10 Kms"),
    ("004", "Within 10-25 Kms"),
    ("005", "More than 25 Kms"),
]);

static BACKGROUND_CHECK: CodeMap = CodeMap::new(&[
    (
        "001",
        "Contract in place + financial, criminal, social media checks once a year",
    ),
    (
        "002",
        "Contract in place + criminal, social media checks once a year",
    ),
    ("003", "Contract in place + Social media checks once a year"),
    ("004", "Contract in place"),
]);

static STOCK_CHECK: CodeMap = CodeMap::new(&[
    ("001", "Daily"),
    ("002", "Weekly"),
    ("003", "Monthly"),
    ("004", "Less than 6 months"),
    ("005", "More than 6 months"),
]);

static RECORDS: CodeMap = CodeMap::new(&[("001", "Online"), ("002", "Offline")]);

static CLAIM_STATUS: CodeMap = CodeMap::new(&[
    ("001", "No claim within 3 years"),
    ("002", "Claims within the past 3 years"),
]);

static DESTINATION_AIRPORT: CodeMap = CodeMap::new(&[
    ("001", "Bangkok airport"),
    ("002", "Hong Kong airport"),
    ("003", "Kuala Lumpur airport"),
    ("004", "Singapore airport"),
    ("005", "Tokyo airport"),
    ("006", "Sydney airport"),
    ("007", "Melbourne airport"),
    ("008", "Jakarta airport"),
    ("009", "All others"),
]);

static EXHIBITION_INSURANCE: CodeMap = CodeMap::new(&[
    ("001", "Exhibition site risk only"),
    (
        "002",
        "Exhibition site risk including transit to/from by professional carrier",
    ),
]);

// ============================================================================
// Field -> map routing
// ============================================================================

/// Fields whose stored value IS the display value. Never decoded.
static PASSTHROUGH_FIELDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "premise_type_others_label",
        "roof_materials_others_label",
        "wall_materials_others_label",
        "floor_materials_others_label",
        "cctv_model_label",
        "cctv_brand_name_label",
        "type_of_backup_others_label",
        "additional_capability_others_label",
        "door_access_others_label",
        "others_label",
        "rear_door_others_label",
        "main_door_others_label",
        "inner_door_others_label",
        "alarm_brand_name_label",
        "alarm_model_label",
        "type_of_alarm_others_label",
        "name_of_cms_company_label",
        "safe_model_label",
        "safe_weight_label",
        "safe_brand_name_label",
        "time_locking_brand_label",
        "wall_showcases_are_protected_by_others_label",
        "dw_counter_showcases_are_protected_by_others_label",
        "display_window_protected_by_others_label",
        "rear_display_window_protected_by_others_label",
        "display_window_form_title_label",
        "director_house_coverage_label",
        "fidelity_guarantee_insurance_label",
        "fidelity_guarantee_total_staff_label",
        "overseas_carrying_label",
        "sum_assured_limit_label",
        "public_exhibitions_label",
        "risk_location_address_label",
        "authorized_company_name_label",
        "description_label",
        "year_of_claim_label",
        "amount_of_claim_label",
        "business_name_label",
        "mobile_number_label",
        "mailing_address_label",
        "office_telephone_label",
        "person_in_charge_label",
        "correspondence_email_label",
        "business_registration_label",
        "property_label",
        "risk_address_label",
        // Premise sub-limit display values
        "maximum_value_kept_as_display_at_during_business_hours_aw_label",
        "maximum_value_kept_as_display_at_during_business_hours_1ar_label",
        "maximum_value_kept_as_display_at_during_business_hours_1pd_label",
        "maximum_value_kept_as_display_at_during_business_hours_aws_label",
        "maximum_value_kept_as_display_at_during_after_business_hours_aw_label",
        "maximum_value_kept_as_display_at_during_after_business_hours_1ar_label",
        "maximum_value_kept_as_display_at_during_after_business_hours_1pd_label",
        "maximum_value_kept_as_display_at_during_after_business_hours_aws_label",
        // Sum assured currency values
        "maximum_stock_in_premises_label",
        "value_of_stock_out_of_safe_label",
        "maximum_stock_during_transit_label",
        "maximum_cash_in_premises_label",
        "maximum_foreign_currency_label",
        "value_of_cash_in_premise_label",
        "value_of_pledged_stock_in_premise_label",
        "value_of_non_pledged_stock_in_premise_label",
        "maximum_stock_foreign_currency_in_premise_label",
        "maximum_stock_foreign_currency_in_transit_label",
        "value_of_stock_in_transit_label",
    ]
    .into_iter()
    .collect()
});

/// Exact field name -> decoder map.
static FIELD_DECODE_TABLE: LazyLock<HashMap<&'static str, &'static CodeMap>> =
    LazyLock::new(|| {
        let mut table: HashMap<&'static str, &'static CodeMap> = HashMap::new();
        let entries: &[(&str, &CodeMap)] = &[
            // Business identity
            ("nature_of_business_label", &BUSINESS_TYPE),
            ("businesstype_id_label", &BUSINESS_TYPE),
            ("industry_id_label", &INDUSTRY),
            // Physical setup
            ("premise_type_label", &PREMISE_TYPE),
            ("roof_materials_label", &MATERIAL),
            ("wall_materials_label", &MATERIAL),
            ("floor_materials_label", &MATERIAL),
            // CCTV
            ("recording_label", &YES_NO),
            ("type_of_back_up_label", &CCTV_BACKUP),
            ("cctv_maintenance_contract_label", &YES_NO),
            ("additional_capability_label", &CCTV_CAPABILITY),
            ("retained_period_of_cctv_recording_label", &CCTV_RETENTION),
            // Door access
            ("door_access_label", &DOOR_ACCESS),
            ("rear_door_label", &REAR_DOOR),
            ("main_door_details_label", &DOOR_MATERIAL),
            ("inner_door_details_label", &DOOR_MATERIAL),
            ("inner_door_iron_glass_label", &YES_NO),
            ("inner_door_iron_wooden_label", &YES_NO),
            ("main_door_roll_and_iron_wood_label", &ROLLER_SHUTTER),
            ("rear_door_roll_and_iron_wood_label", &ROLLER_SHUTTER),
            ("main_door_roll_and_iron_glass_label", &ROLLER_SHUTTER),
            // Alarm
            ("do_you_have_alarm_label", &YES_NO),
            ("connection_type_label", &ALARM_CONNECTION),
            ("type_of_alarm_system_label", &ALARM_TYPE),
            ("under_maintenance_contract_label", &YES_NO),
            ("central_monitoring_stations_label", &YES_NO),
            // Safe
            ("safe_time_locking_label", &YES_NO),
            ("grade_label", &SAFE_GRADE),
            ("certified_label", &YES_NO),
            ("key_combination_code_or_both_label", &KEY_COMBINATION),
            (
                "key_and_combination_code_held_by_separate_personnel_label",
                &YES_NO,
            ),
            // Strong room
            ("do_you_have_a_strong_room_label", &YES_NO),
            ("time_locking_label", &YES_NO),
            // Display showcases
            ("wall_showcase_thickness_label", &SHOWCASE_THICKNESS),
            ("do_you_have_wall_showcase_label", &YES_NO),
            ("wall_showcases_are_protected_by_label", &SHOWCASE_PROTECTION),
            // Display counters
            ("counter_showcase_thickness_label", &COUNTER_THICKNESS),
            ("do_you_have_counter_showcase_label", &YES_NO),
            (
                "counter_showcases_are_protected_by_label",
                &COUNTER_PROTECTION,
            ),
            (
                "rear_counter_showcase_are_protected_by_label",
                &REAR_COUNTER_PROTECTION,
            ),
            // Counter show case
            ("thickness_of_counters_label", &COUNTER_THICKNESS),
            (
                "dw_counter_showcases_are_protected_by_label",
                &DW_COUNTER_PROTECTION,
            ),
            // Display window
            ("do_you_have_display_window_label", &YES_NO),
            ("display_window_protected_by_label", &SHOWCASE_PROTECTION),
            ("display_window_thickness_label", &SHOWCASE_THICKNESS),
            (
                "rear_display_window_protected_by_label",
                &SHOWCASE_PROTECTION,
            ),
            ("rear_display_window_thickness_label", &SHOWCASE_THICKNESS),
            // Transit and guards
            ("usage_of_jaguar_transit_label", &YES_NO),
            ("do_you_use_armoured_vehicle_label", &YES_NO),
            ("do_you_use_guards_at_premise_label", &YES_NO),
            ("installed_gps_tracker_in_transit_bags_label", &YES_NO),
            ("do_you_use_armed_guards_during_transit_label", &YES_NO),
            ("installed_gps_tracker_in_transit_vehicles_label", &YES_NO),
            // Records keeping
            ("records_maintained_in_label", &RECORDS),
            (
                "do_you_keep_detailed_records_of_stock_movements_label",
                &YES_NO,
            ),
            // Additional details
            ("three_piece_rule_label", &YES_NO),
            ("the_nearest_police_station_label", &POLICE_DISTANCE),
            ("standard_operating_procedure_label", &YES_NO),
            ("background_checks_for_all_employees_label", &BACKGROUND_CHECK),
            (
                "how_often_is_the_stock_check_carried_out_label",
                &STOCK_CHECK,
            ),
            // Add-on coverage
            ("director_house_question_label", &YES_NO),
            ("director_house_question_cctv_label", &YES_NO),
            ("director_house_question_safe_label", &YES_NO),
            ("director_house_question_burglar_system_label", &YES_NO),
            ("fidelity_guarantee_insurance_add_coverage_label", &YES_NO),
            ("exhibtion_coverage_question_label", &YES_NO),
            ("outward_entrustment_question_label", &YES_NO),
            ("international_coverage_question_label", &YES_NO),
            ("exhibition_insurance_question_label", &EXHIBITION_INSURANCE),
            ("destination_airport_label", &DESTINATION_AIRPORT),
            // Claim history
            ("claim_history_label", &CLAIM_STATUS),
            // Shop lifting
            ("shop_lifting_label", &YES_NO),
        ];
        for (field, map) in entries {
            table.insert(field, map);
        }
        table
    });

// ============================================================================
// Decode
// ============================================================================

/// Decode one field value.
///
/// Passthrough fields come back trimmed but otherwise untouched. Routed
/// fields look up their map; a miss on a classification map with a numeric
/// code renders `Unknown (<code>)`, any other miss returns the raw value.
pub fn decode_field(field_name: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }

    if PASSTHROUGH_FIELDS.contains(field_name) {
        return value.to_string();
    }

    if let Some(map) = FIELD_DECODE_TABLE.get(field_name) {
        if let Some(label) = map.get(value) {
            return label.to_string();
        }
        if map.classification && value.chars().all(|c| c.is_ascii_digit()) {
            return format!("Unknown ({})", value);
        }
    }

    value.to_string()
}

/// Recursively decode every leaf of a section value. Leaves are decoded
/// under the key that holds them; containers keep their shape.
pub fn decode_json(value: &serde_json::Value) -> serde_json::Value {
    decode_json_inner(None, value)
}

fn decode_json_inner(field_name: Option<&str>, value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), decode_json_inner(Some(k), v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| decode_json_inner(field_name, item))
                .collect(),
        ),
        Value::Null => Value::Null,
        leaf => {
            let raw = scalar_to_string(leaf);
            match field_name {
                Some(name) => Value::String(decode_field(name, &raw)),
                None => Value::String(raw),
            }
        }
    }
}

/// Render a JSON scalar the way it should appear in a field map.
pub fn scalar_to_string(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// Field catalog
// ============================================================================

/// Every field name the decode layer knows about: routed plus passthrough.
/// This is the enumerable domain the parser validates target fields against.
pub fn known_fields() -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = FIELD_DECODE_TABLE
        .keys()
        .chain(PASSTHROUGH_FIELDS.iter())
        .copied()
        .collect();
    fields.sort_unstable();
    fields.dedup();
    fields
}

pub fn is_known_field(name: &str) -> bool {
    FIELD_DECODE_TABLE.contains_key(name) || PASSTHROUGH_FIELDS.contains(name)
}

// ============================================================================
// Display labels (section -> field -> human label)
// ============================================================================

static FIELD_MAPPINGS: LazyLock<HashMap<(&'static str, &'static str), &'static str>> =
    LazyLock::new(|| {
        let entries: &[(&str, &[(&str, &str)])] = &[
            (
                "business_profile",
                &[
                    ("business_name_label", "Business Name"),
                    ("mobile_number_label", "Mobile Number"),
                    ("mailing_address_label", "Mailing Address"),
                    ("office_telephone_label", "Office Telephone"),
                    ("person_in_charge_label", "Person In Charge"),
                    ("nature_of_business_label", "Nature of Business"),
                    ("correspondence_email_label", "Correspondence Email"),
                    ("business_registration_label", "Business Registration Number"),
                ],
            ),
            (
                "physical_setup",
                &[
                    ("premise_type_label", "Premise Type"),
                    ("premise_type_others_label", "Premise Type (Other)"),
                    ("roof_materials_label", "Roof Materials"),
                    ("roof_materials_others_label", "Roof Materials (Other)"),
                    ("wall_materials_label", "Wall Materials"),
                    ("wall_materials_others_label", "Wall Materials (Other)"),
                    ("floor_materials_label", "Floor Materials"),
                    ("floor_materials_others_label", "Floor Materials (Other)"),
                ],
            ),
            (
                "cctv",
                &[
                    ("recording_label", "CCTV Recording"),
                    ("cctv_model_label", "CCTV Model"),
                    ("cctv_brand_name_label", "CCTV Brand Name"),
                    ("type_of_back_up_label", "Type of Backup"),
                    ("type_of_backup_others_label", "Backup Type (Other)"),
                    ("cctv_maintenance_contract_label", "CCTV Maintenance Contract"),
                    ("additional_capability_label", "Additional Capability"),
                    (
                        "additional_capability_others_label",
                        "Additional Capability (Other)",
                    ),
                    (
                        "retained_period_of_cctv_recording_label",
                        "CCTV Recording Retention Period",
                    ),
                ],
            ),
            (
                "door_access",
                &[
                    ("door_access_label", "Door Access Type"),
                    ("door_access_others_label", "Door Access (Other)"),
                    ("others_label", "Others"),
                    ("rear_door_label", "Rear Door Material"),
                    ("rear_door_others_label", "Rear Door (Other)"),
                    ("main_door_details_label", "Main Door Material"),
                    ("main_door_others_label", "Main Door (Other)"),
                    ("inner_door_details_label", "Inner Door Material"),
                    ("inner_door_others_label", "Inner Door (Other)"),
                    ("inner_door_iron_glass_label", "Inner Door Iron Glass"),
                    ("inner_door_iron_wooden_label", "Inner Door Iron Wooden"),
                    ("main_door_roll_and_iron_wood_label", "Main Door Roller/Iron Grill"),
                    ("rear_door_roll_and_iron_wood_label", "Rear Door Roller/Iron Grill"),
                    (
                        "main_door_roll_and_iron_glass_label",
                        "Main Door Roller/Iron Grill (Glass)",
                    ),
                ],
            ),
            (
                "alarm",
                &[
                    ("do_you_have_alarm_label", "Alarm Installed"),
                    ("alarm_brand_name_label", "Alarm Brand Name"),
                    ("alarm_model_label", "Alarm Model"),
                    ("connection_type_label", "Alarm Connection Type"),
                    ("type_of_alarm_system_label", "Type of Alarm System"),
                    ("type_of_alarm_others_label", "Alarm Type (Other)"),
                    ("under_maintenance_contract_label", "Under Maintenance Contract"),
                    ("central_monitoring_stations_label", "Central Monitoring Station"),
                    ("name_of_cms_company_label", "CMS Company Name"),
                ],
            ),
            (
                "safe",
                &[
                    ("safe_model_label", "Safe Model"),
                    ("safe_weight_label", "Safe Weight"),
                    ("safe_brand_name_label", "Safe Brand Name"),
                    ("safe_time_locking_label", "Safe Time Locking"),
                    ("grade_label", "Safe Grade"),
                    ("certified_label", "Safe Certified"),
                    ("key_combination_code_or_both_label", "Key/Combination/Both"),
                    (
                        "key_and_combination_code_held_by_separate_personnel_label",
                        "Key and Code Held Separately",
                    ),
                ],
            ),
            (
                "strong_room",
                &[
                    ("do_you_have_a_strong_room_label", "Strong Room Available"),
                    ("time_locking_label", "Time Locking"),
                    ("time_locking_brand_label", "Time Locking Brand"),
                ],
            ),
            (
                "display_showcases",
                &[
                    ("wall_showcase_thickness_label", "Wall Showcase Thickness"),
                    ("do_you_have_wall_showcase_label", "Wall Showcase Available"),
                    (
                        "wall_showcases_are_protected_by_label",
                        "Wall Showcase Protection",
                    ),
                    (
                        "wall_showcases_are_protected_by_others_label",
                        "Wall Showcase Protection (Other)",
                    ),
                ],
            ),
            (
                "display_counters",
                &[
                    ("counter_showcase_thickness_label", "Counter Showcase Thickness"),
                    ("do_you_have_counter_showcase_label", "Counter Showcase Available"),
                    (
                        "counter_showcases_are_protected_by_label",
                        "Counter Showcase Protection",
                    ),
                    (
                        "rear_counter_showcase_are_protected_by_label",
                        "Rear Counter Protection",
                    ),
                ],
            ),
            (
                "counter_show_case",
                &[
                    ("thickness_of_counters_label", "Counter Thickness"),
                    (
                        "dw_counter_showcases_are_protected_by_label",
                        "Display Window Counter Protection",
                    ),
                    (
                        "dw_counter_showcases_are_protected_by_others_label",
                        "Display Window Counter Protection (Other)",
                    ),
                ],
            ),
            (
                "transit_and_gaurds",
                &[
                    ("usage_of_jaguar_transit_label", "Jaguar Transit Used"),
                    ("do_you_use_armoured_vehicle_label", "Armoured Vehicle Used"),
                    ("do_you_use_guards_at_premise_label", "Guards at Premise"),
                    (
                        "installed_gps_tracker_in_transit_bags_label",
                        "GPS Tracker in Transit Bags",
                    ),
                    (
                        "do_you_use_armed_guards_during_transit_label",
                        "Armed Guards During Transit",
                    ),
                    (
                        "installed_gps_tracker_in_transit_vehicles_label",
                        "GPS Tracker in Transit Vehicles",
                    ),
                ],
            ),
            (
                "records_keeping",
                &[
                    ("records_maintained_in_label", "Records Maintained In"),
                    (
                        "do_you_keep_detailed_records_of_stock_movements_label",
                        "Detailed Stock Records",
                    ),
                ],
            ),
            (
                "additional_details",
                &[
                    ("three_piece_rule_label", "Three Piece Rule"),
                    (
                        "the_nearest_police_station_label",
                        "Nearest Police Station Distance",
                    ),
                    (
                        "standard_operating_procedure_label",
                        "Standard Operating Procedure",
                    ),
                    (
                        "background_checks_for_all_employees_label",
                        "Background Checks for Employees",
                    ),
                    (
                        "how_often_is_the_stock_check_carried_out_label",
                        "Stock Check Frequency",
                    ),
                ],
            ),
            (
                "display_window",
                &[
                    ("display_window_form_title_label", "Display Window Form Title"),
                    ("do_you_have_display_window_label", "Display Window Available"),
                    ("display_window_protected_by_label", "Display Window Protection"),
                    (
                        "display_window_protected_by_others_label",
                        "Display Window Protection (Other)",
                    ),
                    ("display_window_thickness_label", "Display Window Thickness"),
                    (
                        "rear_display_window_protected_by_label",
                        "Rear Display Window Protection",
                    ),
                    (
                        "rear_display_window_protected_by_others_label",
                        "Rear Display Window Protection (Other)",
                    ),
                    (
                        "rear_display_window_thickness_label",
                        "Rear Display Window Thickness",
                    ),
                ],
            ),
            (
                "add_on_coverage",
                &[
                    ("director_house_coverage_label", "Director House Coverage"),
                    ("director_house_question_label", "Director House Question"),
                    ("director_house_question_cctv_label", "Director House CCTV"),
                    ("director_house_question_safe_label", "Director House Safe"),
                    ("fidelity_guarantee_insurance_label", "Fidelity Guarantee Insurance"),
                    (
                        "fidelity_guarantee_total_staff_label",
                        "Fidelity Guarantee Total Staff",
                    ),
                    (
                        "director_house_question_burglar_system_label",
                        "Director House Burglar System",
                    ),
                    (
                        "fidelity_guarantee_insurance_add_coverage_label",
                        "Fidelity Guarantee Add Coverage",
                    ),
                    ("overseas_carrying_label", "Overseas Carrying"),
                    ("sum_assured_limit_label", "Sum Assured Limit"),
                    ("public_exhibitions_label", "Public Exhibitions"),
                    ("destination_airport_label", "Destination Airport"),
                    ("risk_location_address_label", "Risk Location Address"),
                    ("authorized_company_name_label", "Authorized Company Name"),
                    (
                        "exhibtion_coverage_question_label",
                        "Exhibition Coverage Question",
                    ),
                    (
                        "outward_entrustment_question_label",
                        "Outward Entrustment Question",
                    ),
                    (
                        "exhibition_insurance_question_label",
                        "Exhibition Insurance Question",
                    ),
                    (
                        "international_coverage_question_label",
                        "International Coverage Question",
                    ),
                ],
            ),
            (
                "claim_history",
                &[
                    ("claim_history_label", "Claim History Status"),
                    ("description_label", "Claim Description"),
                    ("year_of_claim_label", "Year of Claim"),
                    ("amount_of_claim_label", "Amount of Claim"),
                ],
            ),
            (
                "premise_sub_limit",
                &[
                    (
                        "maximum_value_kept_as_display_at_during_business_hours_aw_label",
                        "Max Display Value (Business Hours) - AW",
                    ),
                    (
                        "maximum_value_kept_as_display_at_during_business_hours_1ar_label",
                        "Max Display Value (Business Hours) - 1AR",
                    ),
                    (
                        "maximum_value_kept_as_display_at_during_business_hours_1pd_label",
                        "Max Display Value (Business Hours) - 1PD",
                    ),
                    (
                        "maximum_value_kept_as_display_at_during_business_hours_aws_label",
                        "Max Display Value (Business Hours) - AWS",
                    ),
                    (
                        "maximum_value_kept_as_display_at_during_after_business_hours_aw_label",
                        "Max Display Value (After Business Hours) - AW",
                    ),
                    (
                        "maximum_value_kept_as_display_at_during_after_business_hours_1ar_label",
                        "Max Display Value (After Business Hours) - 1AR",
                    ),
                    (
                        "maximum_value_kept_as_display_at_during_after_business_hours_1pd_label",
                        "Max Display Value (After Business Hours) - 1PD",
                    ),
                    (
                        "maximum_value_kept_as_display_at_during_after_business_hours_aws_label",
                        "Max Display Value (After Business Hours) - AWS",
                    ),
                ],
            ),
            ("shop_lifting", &[("shop_lifting_label", "Shop Lifting Coverage")]),
            (
                "summary_coverage_values",
                &[
                    ("overseas_carrying_label", "Overseas Carrying"),
                    ("sum_assured_limit_label", "Sum Assured Limit"),
                    ("public_exhibitions_label", "Public Exhibitions"),
                    ("destination_airport_label", "Destination Airport"),
                    ("risk_location_address_label", "Risk Location Address"),
                    ("authorized_company_name_label", "Authorized Company Name"),
                    ("director_house_coverage_label", "Director House Coverage"),
                    ("director_house_question_label", "Director House Question"),
                    (
                        "exhibtion_coverage_question_label",
                        "Exhibition Coverage Question",
                    ),
                    ("director_house_question_cctv_label", "Director House CCTV"),
                    ("director_house_question_safe_label", "Director House Safe"),
                    ("fidelity_guarantee_insurance_label", "Fidelity Guarantee Insurance"),
                    (
                        "outward_entrustment_question_label",
                        "Outward Entrustment Question",
                    ),
                    (
                        "exhibition_insurance_question_label",
                        "Exhibition Insurance Question",
                    ),
                    (
                        "fidelity_guarantee_total_staff_label",
                        "Fidelity Guarantee Total Staff",
                    ),
                    (
                        "international_coverage_question_label",
                        "International Coverage Question",
                    ),
                    (
                        "director_house_question_burglar_system_label",
                        "Director House Burglar System",
                    ),
                    (
                        "fidelity_guarantee_insurance_add_coverage_label",
                        "Fidelity Guarantee Add Coverage",
                    ),
                ],
            ),
            (
                "sum_assured",
                &[
                    ("property_label", "Property Type"),
                    ("risk_address_label", "Risk Address"),
                    ("nature_of_business_label", "Nature of Business"),
                    (
                        "maximum_stock_in_premises_label",
                        "Maximum Stock in Premises (MYR)",
                    ),
                    (
                        "value_of_stock_out_of_safe_label",
                        "Value of Stock Outside Safe (MYR)",
                    ),
                    (
                        "maximum_stock_during_transit_label",
                        "Maximum Stock During Transit (MYR)",
                    ),
                    (
                        "maximum_cash_in_premises_label",
                        "Maximum Cash in Premises (MYR)",
                    ),
                    (
                        "maximum_foreign_currency_label",
                        "Maximum Foreign Currency (MYR)",
                    ),
                    (
                        "value_of_cash_in_premise_label",
                        "Value of Cash in Premises (MYR)",
                    ),
                    (
                        "value_of_pledged_stock_in_premise_label",
                        "Value of Pledged Stock (MYR)",
                    ),
                    (
                        "value_of_non_pledged_stock_in_premise_label",
                        "Value of Non-Pledged Stock (MYR)",
                    ),
                    (
                        "maximum_stock_foreign_currency_in_premise_label",
                        "Max Foreign Currency in Premises (MYR)",
                    ),
                ],
            ),
            ("industry_id", &[("industry_id_label", "Industry")]),
            ("businesstype_id", &[("businesstype_id_label", "Business Type")]),
        ];
        let mut table = HashMap::new();
        for (section, fields) in entries {
            for (field, label) in *fields {
                table.insert((*section, *field), *label);
            }
        }
        table
    });

/// Display label for a field within a section, when one is defined.
pub fn display_label(section: &str, field: &str) -> Option<&'static str> {
    FIELD_MAPPINGS.get(&(section, field)).copied()
}
