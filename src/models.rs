use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;

// ============ Field Schema ============

const NOT_A_WHOLE_NUMBER: &str = "must be a whole number";

/// Shape of a single input field as rendered on the form and enforced at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One of a fixed set of labels.
    Choice(&'static [&'static str]),
    /// Whole number within an inclusive range.
    Integer { min: i64, max: i64, step: i64 },
    /// 0/1 flag rendered as a yes/no select.
    Flag,
}

/// Static description of one `CustomerRecord` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Column name the model was trained with.
    pub name: &'static str,
    /// Human label shown on the form.
    pub label: &'static str,
    pub kind: FieldKind,
    /// Value pre-filled on the form.
    pub default: i64,
}

impl FieldSpec {
    const fn choice(name: &'static str, label: &'static str, labels: &'static [&'static str]) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Choice(labels),
            default: 0,
        }
    }

    const fn integer(
        name: &'static str,
        label: &'static str,
        min: i64,
        max: i64,
        default: i64,
        step: i64,
    ) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Integer { min, max, step },
            default,
        }
    }

    const fn flag(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Flag,
            default: 0,
        }
    }

    /// Inclusive bounds for numeric fields; `None` for choices.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self.kind {
            FieldKind::Integer { min, max, .. } => Some((min, max)),
            FieldKind::Flag => Some((0, 1)),
            FieldKind::Choice(_) => None,
        }
    }

    /// Checks an integer value against this field's domain.
    pub fn check(&self, value: i64) -> Result<i64, FieldViolation> {
        match self.bounds() {
            Some((min, max)) if value < min || value > max => Err(FieldViolation::new(
                self.name,
                if self.kind == FieldKind::Flag {
                    "must be 0 or 1".to_string()
                } else {
                    format!("must be between {} and {}", min, max)
                },
            )),
            _ => Ok(value),
        }
    }

    fn require(&self, value: Option<&Value>, violations: &mut Vec<FieldViolation>) -> Option<i64> {
        let Some(raw) = value else {
            violations.push(FieldViolation::missing(self.name));
            return None;
        };
        let Some(v) = raw.as_i64() else {
            violations.push(FieldViolation::new(self.name, NOT_A_WHOLE_NUMBER));
            return None;
        };

        match self.check(v) {
            Ok(v) => Some(v),
            Err(violation) => {
                violations.push(violation);
                None
            }
        }
    }
}

/// A categorical input whose serialized labels match the training data.
pub trait Categorical: Sized + Copy + 'static {
    /// Column name.
    const FIELD: &'static str;
    const VARIANTS: &'static [Self];
    const LABELS: &'static [&'static str];

    fn label(self) -> &'static str;

    fn parse(label: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.label() == label)
    }
}

macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl Categorical for $name {
            const FIELD: &'static str = $field;
            const VARIANTS: &'static [Self] = &[$(Self::$variant),+];
            const LABELS: &'static [&'static str] = &[$($label),+];

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical!(
    /// How the customer first got in touch.
    TypeOfContact, "TypeofContact" {
        SelfEnquiry => "Self Enquiry",
        CompanyInvited => "Company Invited",
    }
);

categorical!(Occupation, "Occupation" {
    Salaried => "Salaried",
    FreeLancer => "Free Lancer",
    SmallBusiness => "Small Business",
    LargeBusiness => "Large Business",
});

categorical!(Gender, "Gender" {
    Male => "Male",
    Female => "Female",
});

categorical!(
    /// Package tier the salesperson pitched.
    ProductPitched, "ProductPitched" {
        Basic => "Basic",
        Standard => "Standard",
        Deluxe => "Deluxe",
        SuperDeluxe => "Super Deluxe",
        King => "King",
    }
);

categorical!(MaritalStatus, "MaritalStatus" {
    Single => "Single",
    Married => "Married",
    Divorced => "Divorced",
    Unmarried => "Unmarried",
});

categorical!(Designation, "Designation" {
    Executive => "Executive",
    Manager => "Manager",
    SeniorManager => "Senior Manager",
    Avp => "AVP",
    Vp => "VP",
});

pub const TYPE_OF_CONTACT: FieldSpec =
    FieldSpec::choice("TypeofContact", "Type of Contact", TypeOfContact::LABELS);
pub const OCCUPATION: FieldSpec = FieldSpec::choice("Occupation", "Occupation", Occupation::LABELS);
pub const GENDER: FieldSpec = FieldSpec::choice("Gender", "Gender", Gender::LABELS);
pub const PRODUCT_PITCHED: FieldSpec =
    FieldSpec::choice("ProductPitched", "Product Pitched", ProductPitched::LABELS);
pub const MARITAL_STATUS: FieldSpec =
    FieldSpec::choice("MaritalStatus", "Marital Status", MaritalStatus::LABELS);
pub const DESIGNATION: FieldSpec =
    FieldSpec::choice("Designation", "Designation", Designation::LABELS);
pub const AGE: FieldSpec = FieldSpec::integer("Age", "Age", 0, 100, 30, 1);
pub const CITY_TIER: FieldSpec = FieldSpec::integer("CityTier", "City Tier", 1, 3, 2, 1);
pub const DURATION_OF_PITCH: FieldSpec =
    FieldSpec::integer("DurationOfPitch", "Duration of Pitch (minutes)", 0, 200, 20, 1);
pub const NUMBER_OF_PERSON_VISITING: FieldSpec = FieldSpec::integer(
    "NumberOfPersonVisiting",
    "Number Of Persons Visiting",
    1,
    10,
    2,
    1,
);
pub const NUMBER_OF_FOLLOWUPS: FieldSpec =
    FieldSpec::integer("NumberOfFollowups", "Number Of Followups", 0, 20, 2, 1);
pub const PREFERRED_PROPERTY_STAR: FieldSpec =
    FieldSpec::integer("PreferredPropertyStar", "Preferred Property Star", 1, 5, 3, 1);
pub const NUMBER_OF_TRIPS: FieldSpec =
    FieldSpec::integer("NumberOfTrips", "Number Of Trips (per year)", 0, 50, 1, 1);
pub const PASSPORT: FieldSpec = FieldSpec::flag("Passport", "Has Passport?");
pub const PITCH_SATISFACTION_SCORE: FieldSpec =
    FieldSpec::integer("PitchSatisfactionScore", "Pitch Satisfaction Score", 1, 5, 3, 1);
pub const OWN_CAR: FieldSpec = FieldSpec::flag("OwnCar", "Owns Car?");
pub const NUMBER_OF_CHILDREN_VISITING: FieldSpec = FieldSpec::integer(
    "NumberOfChildrenVisiting",
    "Number Of Children Visiting (<5 yrs)",
    0,
    10,
    0,
    1,
);
pub const MONTHLY_INCOME: FieldSpec =
    FieldSpec::integer("MonthlyIncome", "Monthly Income", 0, 1_000_000, 40_000, 1000);

/// All input fields, in the column order the pipeline was trained on.
pub const FIELDS: [FieldSpec; 18] = [
    TYPE_OF_CONTACT,
    OCCUPATION,
    GENDER,
    PRODUCT_PITCHED,
    MARITAL_STATUS,
    DESIGNATION,
    AGE,
    CITY_TIER,
    DURATION_OF_PITCH,
    NUMBER_OF_PERSON_VISITING,
    NUMBER_OF_FOLLOWUPS,
    PREFERRED_PROPERTY_STAR,
    NUMBER_OF_TRIPS,
    PASSPORT,
    PITCH_SATISFACTION_SCORE,
    OWN_CAR,
    NUMBER_OF_CHILDREN_VISITING,
    MONTHLY_INCOME,
];

// ============ Validation Errors ============

/// One rejected field and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(field, "is required")
    }
}

/// A submission that cannot become a `CustomerRecord`.
///
/// Carries every violation found, not just the first, so the form can flag all of them at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Returns true if `field` has at least one violation.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid customer record: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} {}", violation.field, violation.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// ============ Customer Record ============

/// One customer, validated and ready for inference.
///
/// Serialized names are the model's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerRecord {
    #[serde(rename = "TypeofContact")]
    pub type_of_contact: TypeOfContact,
    pub occupation: Occupation,
    pub gender: Gender,
    pub product_pitched: ProductPitched,
    pub marital_status: MaritalStatus,
    pub designation: Designation,
    pub age: i64,
    pub city_tier: i64,
    pub duration_of_pitch: i64,
    pub number_of_person_visiting: i64,
    pub number_of_followups: i64,
    pub preferred_property_star: i64,
    pub number_of_trips: i64,
    pub passport: i64,
    pub pitch_satisfaction_score: i64,
    pub own_car: i64,
    pub number_of_children_visiting: i64,
    pub monthly_income: i64,
}

impl CustomerRecord {
    /// Column names in training order.
    pub const COLUMNS: [&'static str; 18] = [
        "TypeofContact",
        "Occupation",
        "Gender",
        "ProductPitched",
        "MaritalStatus",
        "Designation",
        "Age",
        "CityTier",
        "DurationOfPitch",
        "NumberOfPersonVisiting",
        "NumberOfFollowups",
        "PreferredPropertyStar",
        "NumberOfTrips",
        "Passport",
        "PitchSatisfactionScore",
        "OwnCar",
        "NumberOfChildrenVisiting",
        "MonthlyIncome",
    ];

    /// Categorical columns paired with their labels.
    pub fn categorical_values(&self) -> [(&'static str, &'static str); 6] {
        [
            (TypeOfContact::FIELD, self.type_of_contact.label()),
            (Occupation::FIELD, self.occupation.label()),
            (Gender::FIELD, self.gender.label()),
            (ProductPitched::FIELD, self.product_pitched.label()),
            (MaritalStatus::FIELD, self.marital_status.label()),
            (Designation::FIELD, self.designation.label()),
        ]
    }

    /// Numeric columns paired with their field specs.
    pub fn integer_values(&self) -> [(&'static FieldSpec, i64); 12] {
        [
            (&AGE, self.age),
            (&CITY_TIER, self.city_tier),
            (&DURATION_OF_PITCH, self.duration_of_pitch),
            (&NUMBER_OF_PERSON_VISITING, self.number_of_person_visiting),
            (&NUMBER_OF_FOLLOWUPS, self.number_of_followups),
            (&PREFERRED_PROPERTY_STAR, self.preferred_property_star),
            (&NUMBER_OF_TRIPS, self.number_of_trips),
            (&PASSPORT, self.passport),
            (&PITCH_SATISFACTION_SCORE, self.pitch_satisfaction_score),
            (&OWN_CAR, self.own_car),
            (&NUMBER_OF_CHILDREN_VISITING, self.number_of_children_visiting),
            (&MONTHLY_INCOME, self.monthly_income),
        ]
    }

    /// Checks every numeric field against its domain.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let violations: Vec<FieldViolation> = self
            .integer_values()
            .iter()
            .filter_map(|(spec, value)| spec.check(*value).err())
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }

    /// Parses a urlencoded form submission (all values as text).
    ///
    /// Blank inputs count as missing; non-numeric text is reported per field.
    pub fn from_form_fields(fields: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();
        let text = |name: &str| {
            fields
                .get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut integer = |name: &str| -> Option<Value> {
            let raw = text(name)?;
            match raw.parse::<i64>() {
                Ok(v) => Some(Value::from(v)),
                Err(_) => {
                    violations.push(FieldViolation::new(name, NOT_A_WHOLE_NUMBER));
                    None
                }
            }
        };

        let form = CustomerForm {
            type_of_contact: text(TYPE_OF_CONTACT.name),
            occupation: text(OCCUPATION.name),
            gender: text(GENDER.name),
            product_pitched: text(PRODUCT_PITCHED.name),
            marital_status: text(MARITAL_STATUS.name),
            designation: text(DESIGNATION.name),
            age: integer(AGE.name),
            city_tier: integer(CITY_TIER.name),
            duration_of_pitch: integer(DURATION_OF_PITCH.name),
            number_of_person_visiting: integer(NUMBER_OF_PERSON_VISITING.name),
            number_of_followups: integer(NUMBER_OF_FOLLOWUPS.name),
            preferred_property_star: integer(PREFERRED_PROPERTY_STAR.name),
            number_of_trips: integer(NUMBER_OF_TRIPS.name),
            passport: integer(PASSPORT.name),
            pitch_satisfaction_score: integer(PITCH_SATISFACTION_SCORE.name),
            own_car: integer(OWN_CAR.name),
            number_of_children_visiting: integer(NUMBER_OF_CHILDREN_VISITING.name),
            monthly_income: integer(MONTHLY_INCOME.name),
        };

        match Self::try_from(form) {
            Ok(record) if violations.is_empty() => Ok(record),
            Ok(_) => Err(ValidationError::new(violations)),
            Err(err) => {
                // Unparseable numbers already have a message; skip the generic "is required".
                let parse_failed: Vec<String> = violations.iter().map(|v| v.field.clone()).collect();
                violations.extend(
                    err.violations
                        .into_iter()
                        .filter(|v| !parse_failed.contains(&v.field)),
                );
                violations.sort_by_key(|v| column_index(&v.field));
                Err(ValidationError::new(violations))
            }
        }
    }
}

impl Default for CustomerRecord {
    /// The values the form starts with.
    fn default() -> Self {
        Self {
            type_of_contact: TypeOfContact::SelfEnquiry,
            occupation: Occupation::Salaried,
            gender: Gender::Male,
            product_pitched: ProductPitched::Basic,
            marital_status: MaritalStatus::Single,
            designation: Designation::Executive,
            age: AGE.default,
            city_tier: CITY_TIER.default,
            duration_of_pitch: DURATION_OF_PITCH.default,
            number_of_person_visiting: NUMBER_OF_PERSON_VISITING.default,
            number_of_followups: NUMBER_OF_FOLLOWUPS.default,
            preferred_property_star: PREFERRED_PROPERTY_STAR.default,
            number_of_trips: NUMBER_OF_TRIPS.default,
            passport: PASSPORT.default,
            pitch_satisfaction_score: PITCH_SATISFACTION_SCORE.default,
            own_car: OWN_CAR.default,
            number_of_children_visiting: NUMBER_OF_CHILDREN_VISITING.default,
            monthly_income: MONTHLY_INCOME.default,
        }
    }
}

fn column_index(field: &str) -> usize {
    CustomerRecord::COLUMNS
        .iter()
        .position(|c| *c == field)
        .unwrap_or(CustomerRecord::COLUMNS.len())
}

fn choice<C: Categorical>(value: Option<&str>, violations: &mut Vec<FieldViolation>) -> Option<C> {
    let Some(raw) = value else {
        violations.push(FieldViolation::missing(C::FIELD));
        return None;
    };

    let parsed = C::parse(raw.trim());
    if parsed.is_none() {
        violations.push(FieldViolation::new(
            C::FIELD,
            format!("must be one of: {}", C::LABELS.join(", ")),
        ));
    }
    parsed
}

// ============ Boundary Input ============

/// Raw submission as it arrives over JSON; nothing is trusted yet.
///
/// Numeric fields stay untyped so a float or a string is reported per field
/// instead of rejecting the whole body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerForm {
    #[serde(rename = "TypeofContact")]
    #[schema(example = "Self Enquiry")]
    pub type_of_contact: Option<String>,
    #[schema(example = "Salaried")]
    pub occupation: Option<String>,
    #[schema(example = "Male")]
    pub gender: Option<String>,
    #[schema(example = "Basic")]
    pub product_pitched: Option<String>,
    #[schema(example = "Single")]
    pub marital_status: Option<String>,
    #[schema(example = "Executive")]
    pub designation: Option<String>,
    #[schema(value_type = Option<i64>, example = 30)]
    pub age: Option<Value>,
    #[schema(value_type = Option<i64>, example = 2)]
    pub city_tier: Option<Value>,
    #[schema(value_type = Option<i64>, example = 20)]
    pub duration_of_pitch: Option<Value>,
    #[schema(value_type = Option<i64>, example = 2)]
    pub number_of_person_visiting: Option<Value>,
    #[schema(value_type = Option<i64>, example = 2)]
    pub number_of_followups: Option<Value>,
    #[schema(value_type = Option<i64>, example = 3)]
    pub preferred_property_star: Option<Value>,
    #[schema(value_type = Option<i64>, example = 1)]
    pub number_of_trips: Option<Value>,
    #[schema(value_type = Option<i64>, example = 0)]
    pub passport: Option<Value>,
    #[schema(value_type = Option<i64>, example = 3)]
    pub pitch_satisfaction_score: Option<Value>,
    #[schema(value_type = Option<i64>, example = 0)]
    pub own_car: Option<Value>,
    #[schema(value_type = Option<i64>, example = 0)]
    pub number_of_children_visiting: Option<Value>,
    #[schema(value_type = Option<i64>, example = 40000)]
    pub monthly_income: Option<Value>,
}

impl From<&CustomerRecord> for CustomerForm {
    fn from(record: &CustomerRecord) -> Self {
        Self {
            type_of_contact: Some(record.type_of_contact.label().to_string()),
            occupation: Some(record.occupation.label().to_string()),
            gender: Some(record.gender.label().to_string()),
            product_pitched: Some(record.product_pitched.label().to_string()),
            marital_status: Some(record.marital_status.label().to_string()),
            designation: Some(record.designation.label().to_string()),
            age: Some(record.age.into()),
            city_tier: Some(record.city_tier.into()),
            duration_of_pitch: Some(record.duration_of_pitch.into()),
            number_of_person_visiting: Some(record.number_of_person_visiting.into()),
            number_of_followups: Some(record.number_of_followups.into()),
            preferred_property_star: Some(record.preferred_property_star.into()),
            number_of_trips: Some(record.number_of_trips.into()),
            passport: Some(record.passport.into()),
            pitch_satisfaction_score: Some(record.pitch_satisfaction_score.into()),
            own_car: Some(record.own_car.into()),
            number_of_children_visiting: Some(record.number_of_children_visiting.into()),
            monthly_income: Some(record.monthly_income.into()),
        }
    }
}

impl TryFrom<CustomerForm> for CustomerRecord {
    type Error = ValidationError;

    fn try_from(form: CustomerForm) -> Result<Self, Self::Error> {
        let mut v = Vec::new();

        let fields = (
            choice::<TypeOfContact>(form.type_of_contact.as_deref(), &mut v),
            choice::<Occupation>(form.occupation.as_deref(), &mut v),
            choice::<Gender>(form.gender.as_deref(), &mut v),
            choice::<ProductPitched>(form.product_pitched.as_deref(), &mut v),
            choice::<MaritalStatus>(form.marital_status.as_deref(), &mut v),
            choice::<Designation>(form.designation.as_deref(), &mut v),
            AGE.require(form.age.as_ref(), &mut v),
            CITY_TIER.require(form.city_tier.as_ref(), &mut v),
            DURATION_OF_PITCH.require(form.duration_of_pitch.as_ref(), &mut v),
            NUMBER_OF_PERSON_VISITING.require(form.number_of_person_visiting.as_ref(), &mut v),
            NUMBER_OF_FOLLOWUPS.require(form.number_of_followups.as_ref(), &mut v),
            PREFERRED_PROPERTY_STAR.require(form.preferred_property_star.as_ref(), &mut v),
            NUMBER_OF_TRIPS.require(form.number_of_trips.as_ref(), &mut v),
            PASSPORT.require(form.passport.as_ref(), &mut v),
            PITCH_SATISFACTION_SCORE.require(form.pitch_satisfaction_score.as_ref(), &mut v),
            OWN_CAR.require(form.own_car.as_ref(), &mut v),
            NUMBER_OF_CHILDREN_VISITING.require(form.number_of_children_visiting.as_ref(), &mut v),
            MONTHLY_INCOME.require(form.monthly_income.as_ref(), &mut v),
        );

        let (
            Some(type_of_contact),
            Some(occupation),
            Some(gender),
            Some(product_pitched),
            Some(marital_status),
            Some(designation),
            Some(age),
            Some(city_tier),
            Some(duration_of_pitch),
            Some(number_of_person_visiting),
            Some(number_of_followups),
            Some(preferred_property_star),
            Some(number_of_trips),
            Some(passport),
            Some(pitch_satisfaction_score),
            Some(own_car),
            Some(number_of_children_visiting),
            Some(monthly_income),
        ) = fields
        else {
            return Err(ValidationError::new(v));
        };

        Ok(Self {
            type_of_contact,
            occupation,
            gender,
            product_pitched,
            marital_status,
            designation,
            age,
            city_tier,
            duration_of_pitch,
            number_of_person_visiting,
            number_of_followups,
            preferred_property_star,
            number_of_trips,
            passport,
            pitch_satisfaction_score,
            own_car,
            number_of_children_visiting,
            monthly_income,
        })
    }
}

// ============ Prediction Output ============

/// Outcome of one inference call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionResult {
    /// Probability of the positive class (ProdTaken = 1), in [0, 1].
    pub probability: f64,
    /// 1 when `probability >= 0.5`, else 0.
    pub predicted_class: u8,
}

impl PredictionResult {
    pub fn is_likely_buyer(&self) -> bool {
        self.predicted_class == 1
    }

    /// Short guidance text shown next to the prediction.
    pub fn guidance(&self) -> &'static str {
        if self.is_likely_buyer() {
            "likely buyer"
        } else {
            "unlikely to buy"
        }
    }

    pub fn message(&self) -> String {
        if self.is_likely_buyer() {
            "This customer looks like a likely buyer.".to_string()
        } else {
            "This customer is unlikely to buy.".to_string()
        }
    }
}

/// JSON body returned by `POST /api/v1/predict`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PredictionResponse {
    pub request_id: String,
    pub probability: f64,
    pub predicted_class: u8,
    #[schema(example = "likely buyer")]
    pub guidance: String,
    pub message: String,
}

impl PredictionResponse {
    pub fn new(request_id: String, result: &PredictionResult) -> Self {
        Self {
            request_id,
            probability: result.probability,
            predicted_class: result.predicted_class,
            guidance: result.guidance().to_string(),
            message: result.message(),
        }
    }
}

/// Body of a 422 response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub violations: Vec<FieldViolation>,
}

/// One entry of `GET /api/v1/schema`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    /// "choice", "integer" or "flag".
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[schema(value_type = Object)]
    pub default: serde_json::Value,
}

impl From<&FieldSpec> for FieldDescriptor {
    fn from(spec: &FieldSpec) -> Self {
        let (kind, options, default) = match spec.kind {
            FieldKind::Choice(labels) => (
                "choice",
                Some(labels.iter().map(|l| l.to_string()).collect()),
                serde_json::json!(labels.first().copied().unwrap_or_default()),
            ),
            FieldKind::Integer { .. } => ("integer", None, serde_json::json!(spec.default)),
            FieldKind::Flag => ("flag", None, serde_json::json!(spec.default)),
        };
        let (min, max) = spec.bounds().unzip();

        Self {
            name: spec.name.to_string(),
            label: spec.label.to_string(),
            kind: kind.to_string(),
            options,
            min,
            max,
            default,
        }
    }
}
