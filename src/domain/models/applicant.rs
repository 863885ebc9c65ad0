//! Applicant data carried by a session: the free-form profile used for web
//! verification and the structured loan application scored by the model.

use serde::{Deserialize, Serialize};

/// Applicant identity as entered by the loan officer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub income: u64,
    pub loan_amount: u64,
    /// Term in months
    pub loan_term: u32,
}

impl ApplicantProfile {
    /// One-line description handed to search planning and hit verification.
    pub fn summary(&self) -> String {
        format!(
            "Name: {}; Age: {}; Gender: {}; Annual income: {}; Requested loan: {} over {} months",
            self.name, self.age, self.gender, self.income, self.loan_amount, self.loan_term
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HomeOwnership {
    Rent,
    Own,
    Mortgage,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanIntent {
    Education,
    Medical,
    Venture,
    Personal,
    DebtConsolidation,
    HomeImprovement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanGrade {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultOnFile {
    Y,
    N,
}

/// Structured application consumed by the statistical scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub person_age: u32,
    pub person_income: f64,
    pub person_home_ownership: HomeOwnership,
    /// Employment length in years
    pub person_emp_length: f64,
    pub loan_intent: LoanIntent,
    pub loan_grade: LoanGrade,
    pub loan_amnt: f64,
    pub loan_int_rate: f64,
    pub cb_person_default_on_file: DefaultOnFile,
    /// Credit history length in years
    pub cb_person_cred_hist_length: u32,
}

impl LoanApplication {
    /// Requested amount as a fraction of annual income (0 when income is 0).
    pub fn loan_percent_income(&self) -> f64 {
        if self.person_income > 0.0 {
            self.loan_amnt / self.person_income
        } else {
            0.0
        }
    }

    /// Numeric features plus one-hot categorical keys (`field=VALUE`).
    pub fn features(&self) -> Vec<(String, f64)> {
        let mut features = vec![
            ("person_age".to_string(), f64::from(self.person_age)),
            ("person_income".to_string(), self.person_income),
            ("person_emp_length".to_string(), self.person_emp_length),
            ("loan_amnt".to_string(), self.loan_amnt),
            ("loan_int_rate".to_string(), self.loan_int_rate),
            ("loan_percent_income".to_string(), self.loan_percent_income()),
            (
                "cb_person_cred_hist_length".to_string(),
                f64::from(self.cb_person_cred_hist_length),
            ),
        ];

        let categorical = [
            ("person_home_ownership", enum_tag(&self.person_home_ownership)),
            ("loan_intent", enum_tag(&self.loan_intent)),
            ("loan_grade", enum_tag(&self.loan_grade)),
            ("cb_person_default_on_file", enum_tag(&self.cb_person_default_on_file)),
        ];
        for (field, value) in categorical {
            features.push((format!("{field}={value}"), 1.0));
        }

        features
    }
}

/// Wire name of a unit enum variant.
fn enum_tag<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
