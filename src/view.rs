use std::cmp::Ordering;

use crate::models::Application;
use crate::status::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub status: Status,
    pub cards: Vec<Application>,
}

impl Column {
    pub fn title(&self) -> String {
        format!("{} ({})", self.status.label(), self.cards.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub columns: Vec<Column>,
}

impl BoardView {
    /// One column per status in canonical order; cards keep their input order.
    pub fn build(apps: &[Application]) -> Self {
        let columns = Status::ALL
            .into_iter()
            .map(|status| Column {
                status,
                cards: apps.iter().filter(|a| a.status == status).cloned().collect(),
            })
            .collect();
        Self { columns }
    }

    pub fn column(&self, status: Status) -> Option<&Column> {
        self.columns.iter().find(|c| c.status == status)
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortField {
    Company,
    Role,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub search: String,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub page: usize, // 1-based
    pub per_page: usize,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort_field: SortField::Date,
            sort_direction: SortDirection::Desc,
            page: 1,
            per_page: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePage {
    pub rows: Vec<Application>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl TableView {
    /// Same field flips the direction; a new field starts ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.sort_direction = match self.sort_direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.sort_field = field;
            self.sort_direction = SortDirection::Asc;
        }
    }

    pub fn matches(&self, app: &Application) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || app.company_name.to_lowercase().contains(&needle)
            || app.role_name.to_lowercase().contains(&needle)
    }

    fn compare(&self, a: &Application, b: &Application) -> Ordering {
        let ord = match self.sort_field {
            SortField::Company => a.company_name.to_lowercase().cmp(&b.company_name.to_lowercase()),
            SortField::Role => a.role_name.to_lowercase().cmp(&b.role_name.to_lowercase()),
            SortField::Date => a.date_of_application.cmp(&b.date_of_application),
        };
        match self.sort_direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    pub fn rows(&self, apps: &[Application]) -> Vec<Application> {
        let mut rows: Vec<Application> = apps.iter().filter(|a| self.matches(a)).cloned().collect();
        rows.sort_by(|a, b| self.compare(a, b));
        rows
    }

    pub fn page_of(&self, apps: &[Application]) -> TablePage {
        let rows = self.rows(apps);
        let per_page = self.per_page.max(1);
        let total_items = rows.len();
        let total_pages = total_items.div_ceil(per_page);
        let page = self.page.clamp(1, total_pages.max(1));
        let rows = rows
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        TablePage {
            rows,
            page,
            total_pages,
            total_items,
        }
    }
}
