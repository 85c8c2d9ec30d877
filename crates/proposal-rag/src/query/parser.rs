//! LLM-assisted query parsing.
//!
//! The model only ever translates a question into a structured query; it
//! never sees the data. Deterministic interceptors run before the model so
//! common counting questions, out-of-scope questions and follow-ups resolve
//! without a network round-trip, and a keyword fallback keeps the engine
//! answering when the model is down.

use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::warn;

use crate::llm::LlmClient;
use crate::query::context::ConversationContext;
use crate::store::RecordStore;
use crate::types::{Intent, ParsedQuery};

static JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());
static QUOTE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)MYJADEQT\d+").unwrap());

// ==================== Deterministic interceptor tables ====================

/// Feature phrase -> (field, yes code, no code) for the count interceptor.
/// Scanned in order, first match wins.
const FEATURE_MAP: &[(&str, &str, &str, &str)] = &[
    ("display window", "do_you_have_display_window_label", "001", "002"),
    ("have display window", "do_you_have_display_window_label", "001", "002"),
    ("has display window", "do_you_have_display_window_label", "001", "002"),
    ("window display", "do_you_have_display_window_label", "001", "002"),
    ("wall showcase", "do_you_have_wall_showcase_label", "001", "002"),
    ("counter showcase", "do_you_have_counter_showcase_label", "001", "002"),
    ("alarm", "do_you_have_alarm_label", "001", "002"),
    ("cctv maintenance", "cctv_maintenance_contract_label", "001", "002"),
    ("cctv recording", "recording_label", "001", "002"),
    ("strong room", "do_you_have_a_strong_room_label", "001", "002"),
    ("armoured vehicle", "do_you_use_armoured_vehicle_label", "001", "002"),
    (
        "armed guards",
        "do_you_use_armed_guards_during_transit_label",
        "001",
        "002",
    ),
    ("guards at premise", "do_you_use_guards_at_premise_label", "001", "002"),
    (
        "gps tracker",
        "installed_gps_tracker_in_transit_vehicles_label",
        "001",
        "002",
    ),
    ("jaguar transit", "usage_of_jaguar_transit_label", "001", "002"),
    (
        "standard operating procedure",
        "standard_operating_procedure_label",
        "001",
        "002",
    ),
    ("sop", "standard_operating_procedure_label", "001", "002"),
    (
        "stock records",
        "do_you_keep_detailed_records_of_stock_movements_label",
        "001",
        "002",
    ),
    (
        "detailed records",
        "do_you_keep_detailed_records_of_stock_movements_label",
        "001",
        "002",
    ),
    ("shoplifting", "shop_lifting_label", "1", "2"),
    ("shop lifting", "shop_lifting_label", "1", "2"),
    ("time locking", "time_locking_label", "001", "002"),
    ("central monitoring", "central_monitoring_stations_label", "001", "002"),
    ("alarm maintenance", "under_maintenance_contract_label", "001", "002"),
    (
        "fidelity guarantee",
        "fidelity_guarantee_insurance_add_coverage_label",
        "001",
        "002",
    ),
    ("director house", "director_house_question_label", "001", "002"),
    (
        "background check",
        "background_checks_for_all_employees_label",
        "001",
        "002",
    ),
];

const COUNT_TRIGGERS: &[&str] = &["how many", "count", "number of"];

const NEGATION_WORDS: &[&str] = &[
    "don't have",
    "dont have",
    "do not have",
    "without",
    "no ",
    "not have",
    "haven't",
    "lack",
];

/// Questions the database cannot answer. Matching one refuses gracefully
/// instead of letting the model invent a figure.
const OUT_OF_SCOPE_INDICATORS: &[&str] = &[
    "singapore",
    "indonesia",
    "thailand",
    "philippines",
    "vietnam",
    "average",
    "per year",
    "annually",
    "total across all",
    "predict",
    "forecast",
    "recommend",
    "should i",
    "which is better",
    "compare to industry",
    "benchmark",
    "market rate",
    "credit score",
    "credit rating",
    "financial rating",
    "who approved",
    "underwriter",
    "actuary",
    "monthly premium",
    "annual premium",
    "calculate premium",
];

/// Entity lists used when the store has not been ingested yet.
const FALLBACK_PERSONS: &[&str] = &[
    "Somesh Das",
    "Rohan Mehta",
    "Rahul Mehta",
    "Ankit Verma",
    "Aamir Khan",
    "Suresh Kumar",
    "Naveen Iyer",
    "Kunal Shah",
    "Rakesh Pillai",
    "Farhan Ali",
    "Pranav Joshi",
    "Saad Rahman",
    "Vikram Nair",
    "Ashwin Patel",
    "Irfan Malik",
];

const FALLBACK_BUSINESSES: &[&str] = &[
    "Ja Assure IN",
    "FinSecure Money Services",
    "Mehta Pawn Services",
    "LuxGold Jewellers",
    "Global Money Exchange",
    "Secure Pawn Brokers",
    "Rapid FX Money Exchange",
    "Heritage Gold & Jewels",
    "Heritage Gold and Jewels",
    "Trust Pawn Brokers",
    "City FX Exchange",
    "Royal Gems & Jewels",
    "Royal Gems and Jewels",
    "Metro FX Exchange",
    "Prime Pawn Services",
    "Sunrise Jewel House",
    "Harbor FX Services",
];

// ==================== Parse prompt ====================

const AVAILABLE_FIELDS: &str = r#"
BUSINESS INFO:
- business_name_label: Name of the business
- nature_of_business_label: Type of business (Pawnbroker, Money Changer, etc.)
- businesstype_id_label: Business type ID code
- industry_id_label: Industry ID code
- business_registration_label: Registration number
- person_in_charge_label: Contact person name
- mobile_number_label: Mobile phone number
- office_telephone_label: Office phone
- correspondence_email_label: Email address
- mailing_address_label: Mailing address
- risk_location: Risk/proposal location (city, state, country) - this is a TOP-LEVEL field, not inside fields dict
- user_name: Person/director name associated with the proposal - this is a TOP-LEVEL field

PROPERTY & PREMISES:
- property_label: Property details
- premise_type_label: Type of premises (001=Office building, 002=Shopping centre, 003=Shop house, 004=Others)
- premise_type_others_label: Other premise type details
- floor_materials_label: Floor material (001=Concrete, 002=Tiled, 003=Metal, 004=Wood)
- wall_materials_label: Wall material (001=Concrete, 002=Tiled, 003=Metal, 004=Wood)
- roof_materials_label: Roof material (001=Concrete, 002=Tiled, 003=Metal, 004=Wood)

SECURITY - ALARMS:
- do_you_have_alarm_label: Has alarm system (001=Yes, 002=No)
- type_of_alarm_system_label: Type of alarm (001-010 codes)
- alarm_brand_name_label: Alarm brand
- alarm_model_label: Alarm model
- under_maintenance_contract_label: Alarm under maintenance (001=Yes, 002=No)
- central_monitoring_stations_label: Has central monitoring (001=Yes, 002=No)
- connection_type_label: Alarm connection type
- name_of_cms_company_label: CMS company name

SECURITY - CCTV:
- recording_label: Has CCTV recording (001=Yes, 002=No)
- cctv_maintenance_contract_label: CCTV under maintenance contract (001=Yes, 002=No)
- type_of_back_up_label: Backup type (001-006 codes)
- additional_capability_label: Additional CCTV capability
- retained_period_of_cctv_recording_label: How long CCTV is retained

SECURITY - GUARDS & TRANSIT:
- do_you_use_guards_at_premise_label: Uses guards at premises (001=Yes, 002=No)
- do_you_use_armed_guards_during_transit_label: Uses armed guards (001=Yes, 002=No)
- do_you_use_armoured_vehicle_label: Uses armoured vehicle (001=Yes, 002=No)
- installed_gps_tracker_in_transit_vehicles_label: GPS in vehicles (001=Yes, 002=No)
- installed_gps_tracker_in_transit_bags_label: GPS in bags (001=Yes, 002=No)
- usage_of_jaguar_transit_label: Uses Jaguar transit service (001=Yes, 002=No)

SECURITY - SAFE & STRONG ROOM:
- do_you_have_a_strong_room_label: Has strong room (001=Yes, 002=No)
- time_locking_label: Has time lock (001=Yes, 002=No)
- time_locking_brand_label: Time lock brand
- safe_model_label: Safe model
- safe_brand_name_label: Safe brand
- safe_weight_label: Safe weight
- grade_label: Safe grade (001-008 codes)
- certified_label: Safe certified (001=Yes, 002=No)
- key_combination_code_or_both_label: Key/Combination/Both (001-003)

SECURITY - DOORS:
- door_access_label: Door access type (001-006 codes)
- main_door_details_label: Main door material (001-004 codes)
- inner_door_details_label: Inner door material
- rear_door_label: Rear door type (001-003 codes)

SECURITY - SHOWCASES & WINDOWS:
- do_you_have_counter_showcase_label: Has counter showcase (001=Yes, 002=No)
- counter_showcase_thickness_label: Showcase glass thickness
- do_you_have_display_window_label: Has display window (001=Yes, 002=No)
- display_window_thickness_label: Display window thickness
- do_you_have_wall_showcase_label: Has wall showcase (001=Yes, 002=No)
- wall_showcase_thickness_label: Wall showcase thickness

VALUES & STOCK:
- maximum_stock_in_premises_label: Max stock value in premises
- value_of_stock_out_of_safe_label: Stock value outside safe
- maximum_stock_during_transit_label: Max stock in transit
- value_of_cash_in_premise_label: Cash in premises
- value_of_pledged_stock_in_premise_label: Pledged stock value
- value_of_non_pledged_stock_in_premise_label: Non-pledged stock value
- maximum_stock_foreign_currency_in_premise_label: Foreign currency in premises
- sum_assured_limit_label: Sum assured / coverage limit

CLAIMS & LOSSES:
- claim_history_label: Claims history status (001=No claim within 3 years, 002=Claims within past 3 years)
- description_label: Claim description
- year_of_claim_label: Year of claim
- amount_of_claim_label: Amount of claim

SHOPLIFTING:
- shop_lifting_label: Has shoplifting coverage/cases (1=Yes, 2=No)
  IMPORTANT: For "shoplifting cases" questions, use this field with filter_value="1" for Yes

EMPLOYEES:
- background_checks_for_all_employees_label: Does background checks (001-004 codes)
- fidelity_guarantee_insurance_label: Has fidelity insurance
- fidelity_guarantee_total_staff_label: Total staff covered

PROCEDURES:
- standard_operating_procedure_label: Has SOP (001=Yes, 002=No)
- do_you_keep_detailed_records_of_stock_movements_label: Keeps stock records (001=Yes, 002=No)
- how_often_is_the_stock_check_carried_out_label: Stock check frequency (001-005 codes)
- records_maintained_in_label: How records are maintained (001=Online, 002=Offline)
- the_nearest_police_station_label: Nearest police station distance (001-005 codes)

ADD-ON COVERAGE:
- director_house_coverage_label: Director house coverage details
- director_house_question_label: Director house question (001=Yes, 002=No)
- overseas_carrying_label: Overseas carrying coverage
- public_exhibitions_label: Public exhibitions coverage
"#;

const PARSE_PROMPT: &str = r#"You are a query parser for an insurance proposal database. Parse the user's question and extract structured information.

AVAILABLE FIELDS IN DATABASE:
{fields}

{history_section}
CURRENT USER QUESTION: {query}

Parse this question and output ONLY a JSON object with these fields:
{
    "intent": "ONE of: count, list, lookup, compare",
    "target_fields": ["field1_label", "field2_label"],
    "filter_field": "field_name_label or null",
    "filter_value": "the coded value to filter on, or null",
    "filter_contains": "text to search for in field value or null",
    "quote_id": "MYJADEQTXXX or null",
    "output_fields": ["field1_label", "field2_label"],
    "understood_question": "brief restatement of what user is asking"
}

NATURAL LANGUAGE PHRASE MAPPINGS — ALWAYS use these exact field names when you detect the corresponding natural language phrase in the query:

"type of business" / "what kind of business" / "what business" / "nature of business"
  → nature_of_business_label (NOT business_name_label)

"door access" / "how do they access" / "entry method" / "access control"
  → door_access_label

"background check" / "employee check" / "staff check" / "screening"
  → background_checks_for_all_employees_label

"stock records" / "detailed records" / "keep records" / "record stock" / "stock movements"
  → do_you_keep_detailed_records_of_stock_movements_label
  (NEVER invent a field name — this is the exact field name, use it verbatim)

"standard operating procedure" / "SOP" / "procedures in place"
  → standard_operating_procedure_label

"CCTV backup" / "type of backup" / "backup type" / "recording backup"
  → type_of_back_up_label (NOT director_house_question_cctv_label)

"claim history" / "claims" / "previous claims" / "any claims"
  → claim_history_label (use in output_fields ONLY, never in filter_field unless explicitly filtering by claim status)

"stock check frequency" / "how often stock" / "stock check" / "checking stock"
  → how_often_is_the_stock_check_carried_out_label

"nearest police" / "police station" / "distance to police" / "how far police"
  → the_nearest_police_station_label

"armed guards transit" / "guards during transit" / "transit guards"
  → do_you_use_armed_guards_during_transit_label (NOT do_you_use_guards_at_premise_label)

"guards at premise" / "guards at shop" / "security guards on site"
  → do_you_use_guards_at_premise_label

"armoured vehicle" / "armored vehicle" / "security vehicle"
  → do_you_use_armoured_vehicle_label

"strong room" / "strongroom" / "vault room"
  → do_you_have_a_strong_room_label

"CCTV maintenance" / "camera maintenance" / "maintenance contract for CCTV"
  → cctv_maintenance_contract_label

"CCTV retention" / "how long CCTV" / "recording retention" / "how long recordings kept"
  → retained_period_of_cctv_recording_label

"safe grade" / "grade of safe" / "safe rating"
  → grade_label

"GPS tracker" / "GPS in bags" / "tracker in bags"
  → installed_gps_tracker_in_transit_bags_label

"GPS in vehicles" / "tracker in vehicles" / "vehicle GPS"
  → installed_gps_tracker_in_transit_vehicles_label

"records maintained" / "how records kept" / "online or offline records"
  → records_maintained_in_label

CRITICAL RULE: You MUST map the query to the exact field names listed above.
NEVER construct a field name by concatenating words from the question itself.
If you are unsure of the field name, pick the closest one from AVAILABLE_FIELDS.
An imperfect field name from the list is always better than an invented one.

PARSING RULES:
1. "intent" MUST be exactly ONE word from: count, list, lookup, compare. Never combine them.
2. For "how many" / "count" questions → intent = "count"
   EXCEPTION: "how much", "how often", "how long" for a SPECIFIC person/business → intent = "lookup" (these ask for a field VALUE, not a count)
3. For "list all", "what are", "show", "which", "give names" → intent = "list"
4. If asking "how many" AND also asking for names in the same sentence → intent = "count" (names will be added automatically)
5. For specific quote questions → intent = "lookup"
6. For "highest", "lowest" → intent = "compare"
7. Map natural language to exact field names from the list above
8. For claims/losses questions, use "claim_history_label" and filter_contains
9. For Yes/No fields coded as 001/002: filter_value should be the CODE ("001" for Yes, "002" for No)
   For shop_lifting_label coded as 1/2: filter_value="1" for Yes, filter_value="2" for No
10. output_fields = what fields to show in the answer
11. CRITICAL: If there is CONVERSATION HISTORY above, use it to resolve references like "these", "those", "them", "the above", "their names", etc. The follow-up query MUST inherit the same filter_field and filter_value from the previous query context.
12. Pay close attention to NEGATION words: "don't have", "without", "no", "not" → these flip the filter value to the opposite.
13. CRITICAL — NEVER set filter_field when the query is asking for a specific entity by name. When filter_contains has a business name or person name, set filter_field=null and filter_value=null. filter_field is ONLY for filtering the entire dataset (e.g., "show all businesses WITH alarm").
14. CRITICAL — NEVER set filter_field to the same field as output_fields unless you are explicitly filtering the whole dataset by that field's value. If query says "what is the claim history of X", output_fields=["claim_history_label"] and filter_field=null, filter_contains="X". Do NOT set filter_field=claim_history_label.
15. CRITICAL — filter_contains must contain EXACTLY the name as stated in the query. If the query says "Rapid FX Money Exchange" then filter_contains must be "Rapid FX Money Exchange". NEVER replace a business name with a person name. NEVER invent names. Copy the exact string from the query.
16. CRITICAL — When a query asks about a SPECIFIC named business or person (filter_contains is set), do NOT also set filter_field and filter_value unless the query explicitly asks for filtering within that business's data.
17. CRITICAL — For location-based queries ("how many in Penang", "proposals located in X"), filter_contains must contain ONLY the location name exactly as stated in the query. NEVER use a business name or person name as filter_contains for location queries. Example: "how many proposals are in Penang?" → filter_contains="Penang". Example: "proposals in Johor Bahru" → filter_contains="Johor Bahru".
18. CRITICAL — ZERO TOLERANCE FOR CONTEXT BLEED:
    filter_contains must ALWAYS come from the CURRENT question only.
    NEVER copy filter_contains from a previous conversation turn.
    If the current question asks about "Somesh Das", filter_contains="Somesh Das".
    If the current question asks about "GPS tracker businesses", filter_contains=null.
    Read the CURRENT question. Ignore all previous filter_contains values.
    This rule overrides everything else.

EXAMPLES:
- "How many have CCTV maintenance?" → {"intent": "count", "target_fields": ["cctv_maintenance_contract_label"], "filter_field": "cctv_maintenance_contract_label", "filter_value": "001", "output_fields": ["business_name_label"], "understood_question": "Count proposals with CCTV maintenance (=Yes/001)"}
- "How many businesses have shoplifting cases?" → {"intent": "count", "target_fields": ["shop_lifting_label"], "filter_field": "shop_lifting_label", "filter_value": "1", "output_fields": ["business_name_label"], "understood_question": "Count proposals with shoplifting (shop_lifting_label=1)"}
- "How many businesses don't have shoplifting cases?" → {"intent": "count", "target_fields": ["shop_lifting_label"], "filter_field": "shop_lifting_label", "filter_value": "2", "output_fields": ["business_name_label"], "understood_question": "Count proposals WITHOUT shoplifting (shop_lifting_label=2)"}
- "Which businesses have shoplifting?" → {"intent": "list", "target_fields": ["shop_lifting_label"], "filter_field": "shop_lifting_label", "filter_value": "1", "output_fields": ["business_name_label"], "understood_question": "List proposals with shoplifting coverage"}
- "How many have alarms?" → {"intent": "count", "target_fields": ["do_you_have_alarm_label"], "filter_field": "do_you_have_alarm_label", "filter_value": "001", "output_fields": ["business_name_label"], "understood_question": "Count proposals with alarms (=Yes/001)"}
- "How many don't have alarms?" → {"intent": "count", "target_fields": ["do_you_have_alarm_label"], "filter_field": "do_you_have_alarm_label", "filter_value": "002", "output_fields": ["business_name_label"], "understood_question": "Count proposals WITHOUT alarms (=No/002)"}
- "What is the business name of MYJADEQT001?" → {"intent": "lookup", "quote_id": "MYJADEQT001", "output_fields": ["business_name_label"], "understood_question": "Get business name for MYJADEQT001"}
- "How many proposals are in shopping centres?" → {"intent": "count", "target_fields": ["premise_type_label"], "filter_field": "premise_type_label", "filter_value": "002", "output_fields": ["business_name_label"], "understood_question": "Count proposals in shopping centre premises (premise_type_label=002)"}
- "How many proposals are located in Johor Bahru?" → {"intent": "count", "target_fields": ["risk_location"], "filter_field": null, "filter_value": null, "filter_contains": "Johor Bahru", "output_fields": ["business_name_label"], "understood_question": "Count proposals located in Johor Bahru"}
- "Which businesses are in Kuala Lumpur?" → {"intent": "list", "target_fields": ["risk_location"], "filter_field": null, "filter_value": null, "filter_contains": "Kuala Lumpur", "output_fields": ["business_name_label"], "understood_question": "List proposals in Kuala Lumpur"}
- "What is the house coverage for Suresh Kumar?" → {"intent": "lookup", "target_fields": ["director_house_coverage_label"], "filter_field": null, "filter_value": null, "filter_contains": "Suresh Kumar", "output_fields": ["director_house_coverage_label"], "understood_question": "Get director house coverage for person named Suresh Kumar"}
- "What type of business does City FX Exchange have?" → {"intent": "lookup", "target_fields": ["nature_of_business_label"], "filter_field": null, "filter_value": null, "filter_contains": "City FX Exchange", "output_fields": ["nature_of_business_label"], "understood_question": "Get business type for City FX Exchange"}
- "Does Mehta Pawn Services have a strong room?" → {"intent": "lookup", "target_fields": ["do_you_have_a_strong_room_label"], "filter_field": null, "filter_value": null, "filter_contains": "Mehta Pawn Services", "output_fields": ["do_you_have_a_strong_room_label"], "understood_question": "Check if Mehta Pawn Services has a strong room"}
- "What is the alarm brand for MYJADEQT003?" → {"intent": "lookup", "quote_id": "MYJADEQT003", "output_fields": ["alarm_brand_name_label"], "understood_question": "Get alarm brand for MYJADEQT003"}
- "How often is the stock check carried out for Suresh Kumar?" → {"intent": "lookup", "target_fields": ["how_often_is_the_stock_check_carried_out_label"], "filter_field": null, "filter_value": null, "filter_contains": "Suresh Kumar", "output_fields": ["how_often_is_the_stock_check_carried_out_label"], "understood_question": "Get stock check frequency for Suresh Kumar"}
- "How much cash does Heritage Gold & Jewels keep in premise?" → {"intent": "lookup", "target_fields": ["value_of_cash_in_premise_label"], "filter_field": null, "filter_value": null, "filter_contains": "Heritage Gold & Jewels", "output_fields": ["value_of_cash_in_premise_label"], "understood_question": "Get cash in premise value for Heritage Gold & Jewels"}
- "What type of business does Suresh Kumar run?" → {"intent": "lookup", "target_fields": ["nature_of_business_label"], "filter_field": null, "filter_value": null, "filter_contains": "Suresh Kumar", "output_fields": ["nature_of_business_label"], "understood_question": "Get nature of business for Suresh Kumar"}
- "Does Heritage Gold and Jewels have a CCTV maintenance contract?" → {"intent": "lookup", "target_fields": ["cctv_maintenance_contract_label"], "filter_field": null, "filter_value": null, "filter_contains": "Heritage Gold and Jewels", "output_fields": ["cctv_maintenance_contract_label"], "understood_question": "Check CCTV maintenance contract for Heritage Gold and Jewels"}
- "What is the door access type used by Global Money Exchange?" → {"intent": "lookup", "target_fields": ["door_access_label"], "filter_field": null, "filter_value": null, "filter_contains": "Global Money Exchange", "output_fields": ["door_access_label"], "understood_question": "Get door access type for Global Money Exchange"}
- "Does Rapid FX Money Exchange use armed guards during transit?" → {"intent": "lookup", "target_fields": ["do_you_use_armed_guards_during_transit_label"], "filter_field": null, "filter_value": null, "filter_contains": "Rapid FX Money Exchange", "output_fields": ["do_you_use_armed_guards_during_transit_label"], "understood_question": "Check if Rapid FX Money Exchange uses armed guards during transit"}
- "What background checks does LuxGold Jewellers do?" → {"intent": "lookup", "target_fields": ["background_checks_for_all_employees_label"], "filter_field": null, "filter_value": null, "filter_contains": "LuxGold Jewellers", "output_fields": ["background_checks_for_all_employees_label"], "understood_question": "Get background check details for LuxGold Jewellers"}
- "What is the claim history of Heritage Gold?" → {"intent": "lookup", "target_fields": ["claim_history_label"], "filter_field": null, "filter_value": null, "filter_contains": "Heritage Gold", "output_fields": ["claim_history_label"], "understood_question": "Get claim history for Heritage Gold"}
- "Does Royal Gems keep detailed records of stock movements?" → {"intent": "lookup", "target_fields": ["do_you_keep_detailed_records_of_stock_movements_label"], "filter_field": null, "filter_value": null, "filter_contains": "Royal Gems", "output_fields": ["do_you_keep_detailed_records_of_stock_movements_label"], "understood_question": "Check if Royal Gems keeps detailed records of stock movements"}
- "What type of CCTV backup does Secure Pawn use?" → {"intent": "lookup", "target_fields": ["type_of_back_up_label"], "filter_field": null, "filter_value": null, "filter_contains": "Secure Pawn", "output_fields": ["type_of_back_up_label"], "understood_question": "Get CCTV backup type for Secure Pawn"}

IMPORTANT REMINDERS:
- intent must be EXACTLY one of: count, list, lookup, compare. NEVER output "count|list" or any combined form.
- For shoplifting: filter_value="1" means HAS shoplifting, filter_value="2" means DOES NOT have shoplifting.
- For 001/002 coded fields: "001" = Yes, "002" = No.
- NEGATION flips the value: "don't have X" / "without X" / "no X" means filter on the NO/negative code.
- For LOCATION/ADDRESS queries ("in Johor Bahru", "located in KL"), use filter_contains with the location name. Do NOT use filter_value for locations.
- For TEXT SEARCH queries (searching by name, address, company), use filter_contains for substring matching.
- ENTITY LOOKUP: When asking "what is FIELD for PERSON/BUSINESS?", put the PERSON/BUSINESS name in filter_contains, put the FIELD in output_fields. Do NOT put the field in filter_field unless you are filtering BY that field's value.
- filter_field + filter_value are for filtering rows (e.g., alarm=001 means Yes). Do NOT use filter_field when filter_value is null.
- When the user asks about a specific PERSON or BUSINESS NAME (not a quote ID), use filter_contains with that name and intent="lookup".
- "how often", "how much", "how long" + a PERSON/BUSINESS name = intent "lookup" (NOT "count"). These ask for a specific field VALUE for a named entity.

Output ONLY the JSON, no explanation."#;

// ==================== Parser ====================

pub struct QueryParser {
    llm: Arc<dyn LlmClient>,
    known_persons: Vec<String>,
    known_businesses: Vec<String>,
}

impl QueryParser {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            known_persons: FALLBACK_PERSONS.iter().map(|s| s.to_string()).collect(),
            known_businesses: FALLBACK_BUSINESSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build a parser whose entity lists come from the ingested records,
    /// falling back to the static lists when the store is missing a side.
    pub fn from_store(llm: Arc<dyn LlmClient>, store: &RecordStore) -> Self {
        let mut persons = std::collections::BTreeSet::new();
        let mut businesses = std::collections::BTreeSet::new();

        for chunk in store.chunks() {
            let owner = chunk.owner_name.trim();
            if !owner.is_empty() {
                persons.insert(owner.to_string());
            }
            for (field, value) in &chunk.decoded_fields {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                if field.contains("person_in_charge") {
                    persons.insert(value.to_string());
                } else if field.contains("business_name") {
                    businesses.insert(value.to_string());
                }
            }
        }

        let mut parser = Self::new(llm);
        if !persons.is_empty() {
            parser.known_persons = persons.into_iter().collect();
        }
        if !businesses.is_empty() {
            parser.known_businesses = businesses.into_iter().collect();
        }
        parser
    }

    /// The entity (person or business) named in the query, if any. Person
    /// names win over business names; a two-word business prefix is enough.
    pub fn entity_in_query(&self, query: &str) -> Option<String> {
        let query_lower = query.to_lowercase();

        for name in &self.known_persons {
            if query_lower.contains(&name.to_lowercase()) {
                return Some(name.clone());
            }
        }
        for name in &self.known_businesses {
            if query_lower.contains(&name.to_lowercase()) {
                return Some(name.clone());
            }
        }
        for name in &self.known_businesses {
            let parts: Vec<&str> = name.split_whitespace().collect();
            if parts.len() >= 2 {
                let partial = format!("{} {}", parts[0], parts[1]).to_lowercase();
                if query_lower.contains(&partial) {
                    return Some(name.clone());
                }
            }
        }
        None
    }

    /// Parse one question. Deterministic handlers run first; the model is
    /// only consulted when none of them claim the query.
    pub async fn parse(&self, query: &str, ctx: &ConversationContext) -> ParsedQuery {
        if let Some(parsed) = self.deterministic_count(query) {
            return parsed;
        }

        if is_out_of_scope(query) {
            let mut parsed = ParsedQuery::new(Intent::OutOfScope, query);
            parsed.parse_success = false;
            return parsed;
        }

        if let Some(parsed) = ctx.resolve_followup(query) {
            return parsed;
        }

        let prompt = build_parse_prompt(query, &ctx.history_section(query));
        match self.llm.generate(&prompt).await {
            Ok(response) => self
                .from_llm_response(&response, query)
                .unwrap_or_else(|| fallback_parse(query)),
            Err(e) => {
                warn!(error = %e, "Query parse request failed, using keyword fallback");
                fallback_parse(query)
            }
        }
    }

    fn from_llm_response(&self, response: &str, query: &str) -> Option<ParsedQuery> {
        let json_text = JSON_BLOCK.find(response)?.as_str();
        let value: Value = serde_json::from_str(json_text).ok()?;

        let raw_intent = value
            .get("intent")
            .and_then(Value::as_str)
            .unwrap_or("lookup")
            .trim()
            .to_lowercase();

        let mut parsed = ParsedQuery::new(normalize_intent(&raw_intent, query), query);
        parsed.target_fields = string_list(value.get("target_fields"));
        parsed.filter_field = opt_string(value.get("filter_field"));
        parsed.filter_value = opt_scalar_string(value.get("filter_value"));
        parsed.filter_contains = opt_string(value.get("filter_contains"));
        parsed.record_id = opt_string(value.get("quote_id"));
        parsed.output_fields = string_list(value.get("output_fields"));
        if let Some(understood) = value.get("understood_question").and_then(Value::as_str) {
            parsed.understood_question = understood.to_string();
        }

        // Post-parse validation: filter_contains must be anchored in the
        // current question, never inherited from an earlier turn.
        if let Some(entity) = self.entity_in_query(query) {
            parsed.filter_contains = Some(entity);
        } else if let Some(contains) = &parsed.filter_contains {
            if !query.to_lowercase().contains(&contains.to_lowercase()) {
                parsed.filter_contains = None;
            }
        }

        Some(parsed)
    }

    fn deterministic_count(&self, query: &str) -> Option<ParsedQuery> {
        let query_lower = query.to_lowercase();
        let query_lower = query_lower.trim();

        if !COUNT_TRIGGERS.iter().any(|w| query_lower.contains(w)) {
            return None;
        }

        let negation = NEGATION_WORDS.iter().any(|w| query_lower.contains(w));

        let (field, yes_value, no_value) = FEATURE_MAP
            .iter()
            .find(|(phrase, _, _, _)| query_lower.contains(phrase))
            .map(|(_, field, yes, no)| (*field, *yes, *no))?;

        let mut parsed = ParsedQuery::new(Intent::Count, query);
        parsed.target_fields = vec![field.to_string()];
        parsed.filter_field = Some(field.to_string());
        parsed.filter_value = Some(if negation { no_value } else { yes_value }.to_string());
        parsed.output_fields = vec!["business_name_label".to_string()];
        parsed.understood_question = format!(
            "Count proposals where {}={}",
            field,
            if negation { "No" } else { "Yes" }
        );
        Some(parsed)
    }
}

pub fn is_out_of_scope(query: &str) -> bool {
    let query_lower = query.to_lowercase();
    OUT_OF_SCOPE_INDICATORS
        .iter()
        .any(|ind| query_lower.contains(ind))
}

fn build_parse_prompt(query: &str, history_section: &str) -> String {
    PARSE_PROMPT
        .replace("{fields}", AVAILABLE_FIELDS)
        .replace("{history_section}", history_section)
        .replace("{query}", query)
}

/// Collapse sloppy model output like "count|list" to a single valid intent,
/// falling back to query keywords.
fn normalize_intent(raw_intent: &str, query: &str) -> Intent {
    let query_lower = query.to_lowercase();

    let as_intent = |s: &str| match s {
        "count" => Some(Intent::Count),
        "list" => Some(Intent::List),
        "lookup" => Some(Intent::Lookup),
        "compare" => Some(Intent::Compare),
        _ => None,
    };

    if let Some(intent) = as_intent(raw_intent) {
        return intent;
    }

    let found: Vec<Intent> = raw_intent
        .split(|c: char| matches!(c, '|' | '/' | ',') || c.is_whitespace())
        .filter_map(|part| as_intent(part.trim()))
        .collect();

    if found.is_empty() {
        if ["how many", "count", "number of", "total"]
            .iter()
            .any(|w| query_lower.contains(w))
        {
            return Intent::Count;
        }
        if ["list", "show", "which", "what are", "give", "name"]
            .iter()
            .any(|w| query_lower.contains(w))
        {
            return Intent::List;
        }
        if ["highest", "lowest", "maximum", "minimum"]
            .iter()
            .any(|w| query_lower.contains(w))
        {
            return Intent::Compare;
        }
        return Intent::Lookup;
    }

    if found.contains(&Intent::Count)
        && ["how many", "count", "number of", "total"]
            .iter()
            .any(|w| query_lower.contains(w))
    {
        return Intent::Count;
    }
    if found.contains(&Intent::List)
        && ["list", "show", "which", "what are", "names"]
            .iter()
            .any(|w| query_lower.contains(w))
    {
        return Intent::List;
    }
    found[0]
}

/// Keyword-only parse used when the model is unreachable or returns junk.
fn fallback_parse(query: &str) -> ParsedQuery {
    let query_lower = query.to_lowercase();

    let intent = if ["how many", "count", "number of"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        Intent::Count
    } else if ["list", "show", "what are", "which"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        Intent::List
    } else if ["highest", "lowest", "maximum", "minimum"]
        .iter()
        .any(|w| query_lower.contains(w))
    {
        Intent::Compare
    } else {
        Intent::Lookup
    };

    let mut parsed = ParsedQuery::new(intent, query);
    parsed.record_id = QUOTE_ID.find(query).map(|m| m.as_str().to_uppercase());
    parsed.parse_success = false;
    parsed
}

fn opt_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Like `opt_string` but tolerates the model emitting a bare number.
fn opt_scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    struct CannedLlm(String);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct DownLlm;

    #[async_trait]
    impl LlmClient for DownLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            bail!("connection refused")
        }
    }

    fn parser_with(response: &str) -> QueryParser {
        QueryParser::new(Arc::new(CannedLlm(response.to_string())))
    }

    #[tokio::test]
    async fn count_interceptor_skips_the_model() {
        let parser = parser_with("this would not parse as json");
        let ctx = ConversationContext::new(5);

        let parsed = parser
            .parse("How many proposals have CCTV maintenance?", &ctx)
            .await;
        assert_eq!(parsed.intent, Intent::Count);
        assert_eq!(
            parsed.filter_field.as_deref(),
            Some("cctv_maintenance_contract_label")
        );
        assert_eq!(parsed.filter_value.as_deref(), Some("001"));
        assert_eq!(parsed.output_fields, vec!["business_name_label"]);
        assert!(parsed.parse_success);
    }

    #[tokio::test]
    async fn negated_counts_flip_to_the_no_code() {
        let parser = parser_with("irrelevant");
        let ctx = ConversationContext::new(5);

        let parsed = parser.parse("How many don't have alarms?", &ctx).await;
        assert_eq!(parsed.filter_value.as_deref(), Some("002"));
        assert!(parsed.understood_question.ends_with("=No"));

        let parsed = parser
            .parse("how many businesses have shoplifting cases?", &ctx)
            .await;
        assert_eq!(parsed.filter_field.as_deref(), Some("shop_lifting_label"));
        assert_eq!(parsed.filter_value.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn out_of_scope_queries_are_refused_before_the_model() {
        let parser = parser_with("irrelevant");
        let ctx = ConversationContext::new(5);

        let parsed = parser
            .parse("What is the monthly premium for MYJADEQT001?", &ctx)
            .await;
        assert_eq!(parsed.intent, Intent::OutOfScope);
        assert!(!parsed.parse_success);
    }

    #[tokio::test]
    async fn followups_resolve_without_the_model() {
        let parser = parser_with("irrelevant");
        let mut ctx = ConversationContext::new(5);
        let mut last = ParsedQuery::new(Intent::Count, "how many have alarms?");
        last.filter_field = Some("do_you_have_alarm_label".to_string());
        last.filter_value = Some("001".to_string());
        ctx.add_turn("how many have alarms?", &last, "7 proposals match.");

        let parsed = parser.parse("give me their names", &ctx).await;
        assert_eq!(parsed.intent, Intent::List);
        assert_eq!(
            parsed.filter_field.as_deref(),
            Some("do_you_have_alarm_label")
        );
    }

    #[tokio::test]
    async fn llm_json_is_extracted_and_intent_normalized() {
        let parser = parser_with(
            r#"Here is the parse:
{"intent": "count|list", "target_fields": ["do_you_have_alarm_label"], "filter_field": "do_you_have_alarm_label", "filter_value": "001", "filter_contains": null, "quote_id": null, "output_fields": ["business_name_label"], "understood_question": "Count proposals with alarms"}"#,
        );
        let ctx = ConversationContext::new(5);

        // "which" steers the combined intent to list
        let parsed = parser.parse("which records use an alarm system?", &ctx).await;
        assert_eq!(parsed.intent, Intent::List);
        assert!(parsed.parse_success);
        assert_eq!(parsed.understood_question, "Count proposals with alarms");
    }

    #[tokio::test]
    async fn known_entity_overrides_model_filter_contains() {
        let parser = parser_with(
            r#"{"intent": "lookup", "target_fields": ["grade_label"], "filter_field": null, "filter_value": null, "filter_contains": "Heritage Gold", "quote_id": null, "output_fields": ["grade_label"], "understood_question": "Get safe grade"}"#,
        );
        let ctx = ConversationContext::new(5);

        let parsed = parser
            .parse("what safe grade does Mehta Pawn Services use?", &ctx)
            .await;
        assert_eq!(parsed.filter_contains.as_deref(), Some("Mehta Pawn Services"));
    }

    #[tokio::test]
    async fn stale_filter_contains_is_cleared() {
        let parser = parser_with(
            r#"{"intent": "lookup", "target_fields": ["grade_label"], "filter_field": null, "filter_value": null, "filter_contains": "Heritage Gold", "quote_id": null, "output_fields": ["grade_label"], "understood_question": "Get safe grade"}"#,
        );
        let ctx = ConversationContext::new(5);

        let parsed = parser.parse("what safe grades exist?", &ctx).await;
        assert!(parsed.filter_contains.is_none());
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_keywords() {
        let parser = QueryParser::new(Arc::new(DownLlm));
        let ctx = ConversationContext::new(5);

        let parsed = parser.parse("tell me about myjadeqt004", &ctx).await;
        assert_eq!(parsed.intent, Intent::Lookup);
        assert_eq!(parsed.record_id.as_deref(), Some("MYJADEQT004"));
        assert!(!parsed.parse_success);

        let parsed = parser.parse("what are the highest sums?", &ctx).await;
        assert_eq!(parsed.intent, Intent::List);
    }

    #[test]
    fn partial_business_prefix_matches_full_name() {
        let parser = parser_with("irrelevant");
        assert_eq!(
            parser.entity_in_query("does rapid fx handle transit?"),
            Some("Rapid FX Money Exchange".to_string())
        );
        assert_eq!(parser.entity_in_query("does anyone handle transit?"), None);
    }

    #[test]
    fn intent_normalization_handles_junk() {
        assert_eq!(normalize_intent("count", "how many?"), Intent::Count);
        assert_eq!(
            normalize_intent("count/list", "how many have cctv?"),
            Intent::Count
        );
        assert_eq!(normalize_intent("summary", "highest value?"), Intent::Compare);
        assert_eq!(normalize_intent("", "tell me about the safe"), Intent::Lookup);
    }
}
