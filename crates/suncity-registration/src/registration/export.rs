//! CSV export of registered visitors for the sales back office. Column order
//! matches the sheet the sales team already imports.

use chrono::{NaiveDate, NaiveDateTime};

const HEADERS: [&str; 11] = [
    "Name",
    "Email",
    "Phone",
    "Project",
    "Location",
    "Budget",
    "Lead Type",
    "Full Address",
    "Occupation",
    "Aadhar Last 4",
    "Date",
];

/// One registered visitor, flattened for the export sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitorRow {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub project: String,
    pub location: String,
    pub budget: String,
    pub lead_type: String,
    pub full_address: String,
    pub occupation: String,
    pub aadhaar_last4: String,
    pub registered_at: NaiveDateTime,
}

/// Which day's registrations to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRange {
    Today,
    On(NaiveDate),
}

impl ExportRange {
    fn date(self, today: NaiveDate) -> NaiveDate {
        match self {
            ExportRange::Today => today,
            ExportRange::On(date) => date,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No users found")]
    NoVisitors,
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export buffer was not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render the visitors registered on the selected day as a CSV document.
/// An empty day is an error so callers surface it instead of shipping an
/// empty sheet.
pub fn export_csv(
    rows: &[VisitorRow],
    range: ExportRange,
    today: NaiveDate,
) -> Result<String, ExportError> {
    let date = range.date(today);
    let selected: Vec<&VisitorRow> = rows
        .iter()
        .filter(|row| row.registered_at.date() == date)
        .collect();
    if selected.is_empty() {
        return Err(ExportError::NoVisitors);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for row in selected {
        writer.write_record([
            row.name.as_str(),
            row.email.as_str(),
            row.phone.as_str(),
            row.project.as_str(),
            row.location.as_str(),
            row.budget.as_str(),
            row.lead_type.as_str(),
            row.full_address.as_str(),
            row.occupation.as_str(),
            row.aadhaar_last4.as_str(),
            &row.registered_at.format("%d-%m-%Y %H:%M").to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Csv(err.into_error().into()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn row(name: &str, date: NaiveDate) -> VisitorRow {
        VisitorRow {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: "9876543210".to_string(),
            project: "3 BHK".to_string(),
            location: "Noida".to_string(),
            budget: "1.5 Cr".to_string(),
            lead_type: "direct".to_string(),
            full_address: "Sector 150, Noida".to_string(),
            occupation: "Engineer".to_string(),
            aadhaar_last4: "1234".to_string(),
            registered_at: date.and_hms_opt(11, 30, 0).unwrap(),
        }
    }

    #[test]
    fn exports_only_the_selected_day() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let rows = vec![row("Asha", today), row("Vikram", yesterday)];

        let csv = export_csv(&rows, ExportRange::Today, today).unwrap();
        assert!(csv.starts_with("Name,Email,Phone,Project,Location,Budget,Lead Type,"));
        assert!(csv.contains("Asha"));
        assert!(!csv.contains("Vikram"));
    }

    #[test]
    fn explicit_date_overrides_today() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2025, 5, 28).unwrap();
        let rows = vec![row("Meera", earlier)];

        let csv = export_csv(&rows, ExportRange::On(earlier), today).unwrap();
        assert!(csv.contains("Meera"));
        assert!(csv.contains("28-05-2025"));
    }

    #[test]
    fn empty_day_is_an_error() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let err = export_csv(&[], ExportRange::Today, today).unwrap_err();
        assert!(matches!(err, ExportError::NoVisitors));
        assert_eq!(err.to_string(), "No users found");
    }
}
