use crate::errors::{AppError, AppResult};
use crate::models::{Employee, Finance, Project};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Projects,
    Employees,
    Finances,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Employees => "employees",
            Self::Finances => "finances",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Projects => "projects.csv",
            Self::Employees => "employees.csv",
            Self::Finances => "finances.csv",
        }
    }

    fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Projects => &["project_id", "project_name", "estimated_days", "complexity"],
            Self::Employees => &["assigned_project", "efficiency"],
            Self::Finances => &["project_id", "spent", "budget"],
        }
    }
}

/// The three uploaded tables, rows in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub projects: Vec<Project>,
    pub employees: Vec<Employee>,
    pub finances: Vec<Finance>,
}

impl Tables {
    pub fn from_bytes(projects: &[u8], employees: &[u8], finances: &[u8]) -> AppResult<Self> {
        Ok(Self {
            projects: read_table(TableKind::Projects, strip_bom(projects))?,
            employees: read_table(TableKind::Employees, strip_bom(employees))?,
            finances: read_table(TableKind::Finances, strip_bom(finances))?,
        })
    }

    pub fn load(projects: &Path, employees: &Path, finances: &Path) -> AppResult<Self> {
        let projects = std::fs::read(projects)
            .map_err(|error| AppError::Io(format!("{}: {}", projects.display(), error)))?;
        let employees = std::fs::read(employees)
            .map_err(|error| AppError::Io(format!("{}: {}", employees.display(), error)))?;
        let finances = std::fs::read(finances)
            .map_err(|error| AppError::Io(format!("{}: {}", finances.display(), error)))?;
        Self::from_bytes(&projects, &employees, &finances)
    }
}

pub fn read_projects<R: Read>(reader: R) -> AppResult<Vec<Project>> {
    read_table(TableKind::Projects, reader)
}

pub fn read_employees<R: Read>(reader: R) -> AppResult<Vec<Employee>> {
    read_table(TableKind::Employees, reader)
}

pub fn read_finances<R: Read>(reader: R) -> AppResult<Vec<Finance>> {
    read_table(TableKind::Finances, reader)
}

/// Reads one table. Missing header columns fail the whole file; rows that do
/// not deserialize are dropped.
pub fn read_table<T, R>(kind: TableKind, reader: R) -> AppResult<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    for column in kind.required_columns() {
        if !headers.iter().any(|header| header == *column) {
            return Err(AppError::Input(format!(
                "{} is missing required column '{}'",
                kind.file_name(),
                column
            )));
        }
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.deserialize::<T>() {
        match record {
            Ok(row) => rows.push(row),
            Err(error) => {
                dropped += 1;
                tracing::debug!(table = kind.as_str(), error = %error, "dropping malformed row");
            }
        }
    }

    if dropped > 0 {
        tracing::debug!(table = kind.as_str(), dropped, kept = rows.len(), "malformed rows excluded");
    }

    Ok(rows)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

#[cfg(test)]
mod tests {
    use super::{read_employees, read_finances, read_projects, Tables};

    #[test]
    fn reads_projects_and_ignores_extra_columns() {
        let csv = "project_id,project_name,estimated_days,complexity,owner\n\
                   P1, Apollo ,100,0.5,ann\n\
                   P2,Gemini,80,0.2,bob\n";
        let projects = read_projects(csv.as_bytes()).expect("parse projects");
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].project_id, "P1");
        assert_eq!(projects[0].project_name, "Apollo");
        assert_eq!(projects[1].estimated_days, 80.0);
    }

    #[test]
    fn drops_rows_that_fail_to_parse() {
        let csv = "assigned_project,efficiency\nP1,0.8\nP1,fast\nP2\nP2,0.6\n";
        let employees = read_employees(csv.as_bytes()).expect("parse employees");
        assert_eq!(employees.len(), 2);
        assert_eq!(employees[1].assigned_project, "P2");
    }

    #[test]
    fn rejects_file_missing_required_column() {
        let csv = "project_id,spent\nP1,10\n";
        let error = read_finances(csv.as_bytes()).expect_err("budget column missing");
        assert!(error.to_string().contains("budget"));
        assert!(error.to_string().starts_with("INPUT_INVALID"));
    }

    #[test]
    fn strips_byte_order_mark_from_uploads() {
        let projects = b"\xEF\xBB\xBFproject_id,project_name,estimated_days,complexity\nP1,A,10,0.1\n";
        let employees = b"assigned_project,efficiency\nP1,0.9\n";
        let finances = b"project_id,spent,budget\nP1,5,10\n";
        let tables = Tables::from_bytes(projects, employees, finances).expect("parse tables");
        assert_eq!(tables.projects.len(), 1);
        assert_eq!(tables.finances[0].budget, 10.0);
    }
}
