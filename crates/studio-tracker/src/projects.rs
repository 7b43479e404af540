//! Project register
//!
//! Projects are never deleted; Suspenso/Cancelado model the end of an
//! engagement that did not complete.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::changelog;
use crate::error::DomainError;
use crate::schema::{self, Collection, Record, Row};

/// Project entry
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub project_id: u64,
    pub client: String,
    /// Lead source ("Indicação", "Instagram", ...)
    pub origin: String,
    /// None when the sheet holds a blank or unknown label
    pub project_type: Option<ProjectType>,
    pub area_m2: f64,
    pub contracted_value: f64,
    pub services: Vec<String>,
    pub city: String,
    pub proposal_link: String,
    pub documents_link: String,
    pub status: ProjectStatus,
    pub registration_date: Option<NaiveDate>,
    pub change_log: String,
}

/// Project type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectType {
    ResidentialSingle,
    ResidentialMulti,
    Commercial,
    Renovation,
    Industrial,
}

impl ProjectType {
    pub fn label(self) -> &'static str {
        match self {
            ProjectType::ResidentialSingle => "Residencial Unifamiliar",
            ProjectType::ResidentialMulti => "Residencial Multifamiliar",
            ProjectType::Commercial => "Comercial",
            ProjectType::Renovation => "Reforma",
            ProjectType::Industrial => "Industrial",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match schema::fold_label(s).as_str() {
            "residencial unifamiliar" | "residential-single" | "unifamiliar" => Ok(ProjectType::ResidentialSingle),
            "residencial multifamiliar" | "residential-multi" | "multifamiliar" => Ok(ProjectType::ResidentialMulti),
            "comercial" | "commercial" => Ok(ProjectType::Commercial),
            "reforma" | "renovation" => Ok(ProjectType::Renovation),
            "industrial" => Ok(ProjectType::Industrial),
            _ => Err(format!(
                "Invalid project type '{}'. Use: residential-single, residential-multi, commercial, renovation, industrial",
                s
            )),
        }
    }
}

/// Overall project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectStatus {
    Active,
    Completed,
    Suspended,
    Cancelled,
}

impl ProjectStatus {
    pub fn label(self) -> &'static str {
        match self {
            ProjectStatus::Active => "Ativo",
            ProjectStatus::Completed => "Concluído",
            ProjectStatus::Suspended => "Suspenso",
            ProjectStatus::Cancelled => "Cancelado",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match schema::fold_label(s).as_str() {
            "ativo" | "active" => Ok(ProjectStatus::Active),
            "concluido" | "completed" => Ok(ProjectStatus::Completed),
            "suspenso" | "suspended" => Ok(ProjectStatus::Suspended),
            "cancelado" | "cancelled" | "canceled" => Ok(ProjectStatus::Cancelled),
            _ => Err(format!(
                "Invalid project status '{}'. Use: Ativo, Concluído, Suspenso, Cancelado",
                s
            )),
        }
    }
}

/// Split the comma-joined services cell, dropping blanks and duplicates
pub fn parse_services(raw: &str) -> Vec<String> {
    let mut services: Vec<String> = Vec::new();
    for service in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !services.iter().any(|s| s == service) {
            services.push(service.to_string());
        }
    }
    services
}

impl Record for Project {
    const COLLECTION: Collection = Collection::Projects;

    fn id(&self) -> u64 {
        self.project_id
    }

    fn from_row(row: &Row) -> Self {
        let get = |c| schema::cell(row, c);
        Self {
            project_id: schema::parse_id(get("ID_Projeto")).unwrap_or(0),
            client: get("Cliente").to_string(),
            origin: get("Origem").to_string(),
            project_type: get("Tipo").parse().ok(),
            area_m2: schema::parse_number(get("Area_m2")),
            contracted_value: schema::parse_number(get("Proposta_Aceita_R$")),
            services: parse_services(get("Servicos")),
            city: get("Cidade").to_string(),
            proposal_link: get("Link_Proposta").to_string(),
            documents_link: get("Link_Documentos").to_string(),
            status: get("Status_Geral").parse().unwrap_or(ProjectStatus::Active),
            registration_date: schema::parse_date(get("Data_Cadastro")),
            change_log: row.get("Historico").cloned().unwrap_or_default(),
        }
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        let mut put = |c: &str, v: String| {
            row.insert(c.to_string(), v);
        };
        put("ID_Projeto", self.project_id.to_string());
        put("Cliente", self.client.clone());
        put("Origem", self.origin.clone());
        put("Tipo", self.project_type.map(|t| t.label().to_string()).unwrap_or_default());
        put("Area_m2", schema::number_cell(self.area_m2));
        put("Proposta_Aceita_R$", schema::number_cell(self.contracted_value));
        put("Servicos", self.services.join(", "));
        put("Cidade", self.city.clone());
        put("Link_Proposta", self.proposal_link.clone());
        put("Link_Documentos", self.documents_link.clone());
        put("Status_Geral", self.status.label().to_string());
        put("Data_Cadastro", schema::date_cell(self.registration_date));
        put("Historico", self.change_log.clone());
        row
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Input for registering a project
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub client: String,
    pub origin: String,
    pub project_type: Option<ProjectType>,
    pub area_m2: f64,
    pub contracted_value: f64,
    pub services: Vec<String>,
    pub city: String,
    pub proposal_link: String,
    pub documents_link: String,
}

/// Optional field edits; `None` leaves the field as is
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub status: Option<ProjectStatus>,
    pub origin: Option<String>,
    pub city: Option<String>,
    pub area_m2: Option<f64>,
    pub contracted_value: Option<f64>,
    pub proposal_link: Option<String>,
    pub documents_link: Option<String>,
    pub note: Option<String>,
}

pub fn find(projects: &[Project], project_id: u64) -> Option<&Project> {
    projects.iter().find(|p| p.project_id == project_id)
}

fn find_mut(projects: &mut [Project], project_id: u64) -> Result<&mut Project, DomainError> {
    projects
        .iter_mut()
        .find(|p| p.project_id == project_id)
        .ok_or(DomainError::NotFound { entity: "Project", id: project_id })
}

fn check_amount(field: &str, value: f64) -> Result<(), DomainError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::Validation(format!("{} must be a non-negative number, got {}", field, value)))
    }
}

/// Register a new project under an already allocated id
pub fn register(
    projects: &mut Vec<Project>,
    project_id: u64,
    input: NewProject,
    now: DateTime<FixedOffset>,
) -> Result<&Project, DomainError> {
    if input.client.trim().is_empty() {
        return Err(DomainError::Validation("client is required".to_string()));
    }
    check_amount("area_m2", input.area_m2)?;
    check_amount("contracted_value", input.contracted_value)?;
    if find(projects, project_id).is_some() {
        return Err(DomainError::DuplicateId { collection: Collection::Projects, id: project_id });
    }

    let mut change_log = String::new();
    changelog::append(&mut change_log, now, "Projeto cadastrado");

    projects.push(Project {
        project_id,
        client: input.client.trim().to_string(),
        origin: input.origin.trim().to_string(),
        project_type: input.project_type,
        area_m2: input.area_m2,
        contracted_value: input.contracted_value,
        services: parse_services(&input.services.join(",")),
        city: input.city.trim().to_string(),
        proposal_link: input.proposal_link,
        documents_link: input.documents_link,
        status: ProjectStatus::Active,
        registration_date: Some(now.date_naive()),
        change_log,
    });

    Ok(&projects[projects.len() - 1])
}

/// Apply field edits, logging each change. Returns the number of fields changed.
pub fn apply_update(
    projects: &mut [Project],
    project_id: u64,
    update: ProjectUpdate,
    now: DateTime<FixedOffset>,
) -> Result<usize, DomainError> {
    if let Some(area) = update.area_m2 {
        check_amount("area_m2", area)?;
    }
    if let Some(value) = update.contracted_value {
        check_amount("contracted_value", value)?;
    }

    let project = find_mut(projects, project_id)?;
    let mut changes = Vec::new();

    if let Some(status) = update.status.filter(|s| *s != project.status) {
        changes.push(changelog::change("Status", project.status.label(), status.label()));
        project.status = status;
    }
    if let Some(origin) = update.origin.filter(|o| *o != project.origin) {
        changes.push(changelog::change("Origem", &project.origin, &origin));
        project.origin = origin;
    }
    if let Some(city) = update.city.filter(|c| *c != project.city) {
        changes.push(changelog::change("Cidade", &project.city, &city));
        project.city = city;
    }
    if let Some(area) = update.area_m2.filter(|a| *a != project.area_m2) {
        changes.push(changelog::change("Área", &project.area_m2.to_string(), &area.to_string()));
        project.area_m2 = area;
    }
    if let Some(value) = update.contracted_value.filter(|v| *v != project.contracted_value) {
        changes.push(changelog::change(
            "Proposta",
            &format!("{:.2}", project.contracted_value),
            &format!("{:.2}", value),
        ));
        project.contracted_value = value;
    }
    if let Some(link) = update.proposal_link.filter(|l| *l != project.proposal_link) {
        changes.push("Link da proposta atualizado".to_string());
        project.proposal_link = link;
    }
    if let Some(link) = update.documents_link.filter(|l| *l != project.documents_link) {
        changes.push("Link dos documentos atualizado".to_string());
        project.documents_link = link;
    }
    if let Some(note) = update.note.filter(|n| !n.trim().is_empty()) {
        changes.push(format!("Nota: {}", note.trim()));
    }

    for entry in &changes {
        changelog::append(&mut project.change_log, now, entry);
    }

    Ok(changes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 10, 10, 0, 0)
            .unwrap()
    }

    fn new_project(client: &str) -> NewProject {
        NewProject {
            client: client.to_string(),
            origin: "Indicação".to_string(),
            project_type: Some(ProjectType::Renovation),
            area_m2: 120.0,
            contracted_value: 18_000.0,
            services: vec!["Arquitetura".to_string(), "Interiores".to_string()],
            city: "Curitiba".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_sets_defaults_and_log() {
        let mut projects = Vec::new();
        let project = register(&mut projects, 1, new_project("Maria Souza"), now()).unwrap();

        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.registration_date, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert!(project.change_log.ends_with("Projeto cadastrado"));
    }

    #[test]
    fn test_register_rejects_blank_client_and_negative_values() {
        let mut projects = Vec::new();
        assert!(matches!(
            register(&mut projects, 1, new_project("  "), now()),
            Err(DomainError::Validation(_))
        ));

        let mut input = new_project("Ana");
        input.area_m2 = -5.0;
        assert!(register(&mut projects, 1, input, now()).is_err());
        assert!(projects.is_empty());
    }

    #[test]
    fn test_register_rejects_reused_id() {
        let mut projects = Vec::new();
        register(&mut projects, 1, new_project("Ana"), now()).unwrap();
        assert!(matches!(
            register(&mut projects, 1, new_project("Bruno"), now()),
            Err(DomainError::DuplicateId { id: 1, .. })
        ));
    }

    #[test]
    fn test_update_logs_only_real_changes() {
        let mut projects = Vec::new();
        register(&mut projects, 1, new_project("Ana"), now()).unwrap();

        let changed = apply_update(
            &mut projects,
            1,
            ProjectUpdate {
                status: Some(ProjectStatus::Completed),
                city: Some("Curitiba".to_string()),
                ..Default::default()
            },
            now(),
        )
        .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(projects[0].status, ProjectStatus::Completed);
        assert!(projects[0].change_log.ends_with("Status: Ativo -> Concluído"));
        assert_eq!(projects[0].change_log.lines().count(), 2);
    }

    #[test]
    fn test_update_unknown_project() {
        let mut projects: Vec<Project> = Vec::new();
        assert!(matches!(
            apply_update(&mut projects, 9, ProjectUpdate::default(), now()),
            Err(DomainError::NotFound { id: 9, .. })
        ));
    }

    #[test]
    fn test_row_round_trip() {
        let mut projects = Vec::new();
        register(&mut projects, 7, new_project("Construtora Ipê"), now()).unwrap();
        let row = projects[0].to_row();
        assert_eq!(row["Servicos"], "Arquitetura, Interiores");
        assert_eq!(row["Tipo"], "Reforma");
        assert_eq!(Project::from_row(&row), projects[0]);
    }

    #[test]
    fn test_malformed_cells_degrade() {
        let mut row = Row::new();
        row.insert("ID_Projeto".to_string(), "4".to_string());
        row.insert("Area_m2".to_string(), "cento e vinte".to_string());
        row.insert("Tipo".to_string(), "Galpão".to_string());
        row.insert("Data_Cadastro".to_string(), "sem data".to_string());

        let project = Project::from_row(&row);
        assert_eq!(project.project_id, 4);
        assert_eq!(project.area_m2, 0.0);
        assert_eq!(project.project_type, None);
        assert_eq!(project.registration_date, None);
        assert_eq!(project.status, ProjectStatus::Active);
    }

    #[test]
    fn test_parse_services_dedups() {
        assert_eq!(parse_services("Arquitetura, Estrutural,,Arquitetura "), vec!["Arquitetura", "Estrutural"]);
    }
}
