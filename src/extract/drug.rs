//! Drug detail page extraction

use crate::crawler::Page;
use crate::extract::html::{child_elements, inner_text, select_first, select_text, select_text_in};
use crate::extract::Extractor;
use scraper::{ElementRef, Html};

const HEADER: &str = r#"div[class="header-panel"] > h1"#;
const DESCRIPTION: &str = r#"div[itemprop="description"]"#;
const INFO_TABLE: &str = r#"div[id*="InstructionPanel"] > table > tbody"#;

const TRANSLATE_PROMPT: &str = "Перевести на русский язык:";
const TRANSLATE_BUTTON: &str = "Перевести";

const DOSAGE_LABEL: &str = "Дозировка";
const MANUFACTURER_LABEL: &str = "Производитель";
const INN_LABEL: &str = "МНН";
const PHARM_GROUP_LABEL: &str = "группа";
const REGISTRATION_LABEL: &str = "Регистрация";
const ATC_CODE_LABEL: &str = "Код АТХ";

/// One drug as listed on its detail page
///
/// Fields the page does not provide are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrugRecord {
    pub name: String,
    pub link: String,
    pub dosage: String,
    pub manufacturer: String,
    pub inn: String,
    pub pharm_group: String,
    pub registration: String,
    /// One `"<code> - <title>"` line per ATC code
    pub atc_code: String,
    pub instruction: String,
}

impl DrugRecord {
    /// Record for a page without the information table
    pub fn minimal(name: String, link: String, instruction: String) -> Self {
        Self {
            name,
            link,
            instruction,
            ..Self::default()
        }
    }
}

/// Parses a drug detail page into a [`DrugRecord`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DrugDetails;

impl Extractor for DrugDetails {
    type Output = DrugRecord;

    fn name(&self) -> &'static str {
        "drugs"
    }

    fn extract(&self, page: &Page) -> Vec<DrugRecord> {
        vec![parse_drug(page)]
    }
}

/// Extracts a drug record, degrading to a minimal one when the info table is absent
pub fn parse_drug(page: &Page) -> DrugRecord {
    tracing::debug!(url = %page.url, "Parsing drug");
    let document = Html::parse_document(&page.body);

    let name = select_text(&document, HEADER);
    let instruction = clean_instruction(&select_text(&document, DESCRIPTION));
    let link = page.url.to_string();

    let Some(table) = select_first(&document, INFO_TABLE) else {
        return DrugRecord::minimal(name, link, instruction);
    };

    let atc_code = row_value(&table, ATC_CODE_LABEL)
        .map(|cell| {
            child_elements(&cell, "div")
                .iter()
                .map(|code| {
                    format!(
                        "{} - {}",
                        select_text_in(code, "b"),
                        select_text_in(code, "a > span")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    DrugRecord {
        name,
        link,
        dosage: row_text(&table, DOSAGE_LABEL),
        manufacturer: row_text(&table, MANUFACTURER_LABEL),
        inn: row_text(&table, INN_LABEL),
        pharm_group: row_text(&table, PHARM_GROUP_LABEL),
        registration: row_text(&table, REGISTRATION_LABEL),
        atc_code,
        instruction,
    }
}

/// Strips the machine-translation prompt from the instruction text
fn clean_instruction(raw: &str) -> String {
    raw.replacen(TRANSLATE_PROMPT, "", 1)
        .replacen(TRANSLATE_BUTTON, "", 1)
        .trim()
        .to_string()
}

/// Cell following the first label cell containing `label`
fn row_value<'a>(table: &ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    child_elements(table, "tr").into_iter().find_map(|row| {
        let cells = child_elements(&row, "td");
        let position = cells
            .iter()
            .position(|cell| inner_text(cell).contains(label))?;
        cells.get(position + 1).copied()
    })
}

fn row_text(table: &ElementRef<'_>, label: &str) -> String {
    row_value(table, label)
        .map(|cell| inner_text(&cell))
        .unwrap_or_default()
}
