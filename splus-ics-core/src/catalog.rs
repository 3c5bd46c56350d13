//! Option lists scraped from the Splus navigation pages.
//!
//! The site offers its choices in three shapes: plain link lists (faculties
//! and plans), `<option>` elements inside a named form (study paths of student
//! set plans and groups) and loose elements whose `value` carries a marker
//! (study paths of every other plan).

use scraper::{ElementRef, Html, Selector};

use crate::{Catalog, Choice, Error, Result};

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Config(format!("Invalid selector {css:?}: {e}")))
}

/// Text content of an element with whitespace collapsed, as a browser would
/// render it.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Direct child elements, skipping text and comment nodes
pub(crate) fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Every `<li>` holding a link becomes one choice; its value is the link
/// target.
pub fn links_catalog(html: &str) -> Result<Catalog> {
    let document = Html::parse_document(html);
    let li = selector("li")?;
    let link = selector("[href]")?;

    let mut catalog = Catalog::new();
    for item in document.select(&li) {
        let Some(anchor) = std::iter::once(item)
            .filter(|el| el.value().attr("href").is_some())
            .chain(item.select(&link))
            .next()
        else {
            continue;
        };
        let value = anchor.value().attr("href").unwrap_or_default();
        catalog.push(Choice::new(catalog.len(), element_text(anchor), value));
    }

    Ok(catalog)
}

/// The `<option>` elements of the form named `form_name`. A page without that
/// form yields an empty catalog.
pub fn form_catalog(html: &str, form_name: &str) -> Result<Catalog> {
    let document = Html::parse_document(html);
    let forms = selector("form")?;
    let options = selector("option")?;

    let Some(form) = document
        .select(&forms)
        .find(|form| form.value().attr("name") == Some(form_name))
    else {
        tracing::debug!("Form {} not found on page", form_name);
        return Ok(Catalog::new());
    };

    let mut catalog = Catalog::new();
    for option in form.select(&options) {
        let value = option.value().attr("value").unwrap_or_default();
        catalog.push(Choice::new(catalog.len(), element_text(option), value));
    }

    Ok(catalog)
}

/// Every element whose `value` attribute contains `marker`, in document order
pub fn marked_catalog(html: &str, marker: &str) -> Result<Catalog> {
    let document = Html::parse_document(html);
    let any = selector("[value]")?;

    let mut catalog = Catalog::new();
    for element in document.select(&any) {
        let Some(value) = element.value().attr("value") else {
            continue;
        };
        if value.contains(marker) {
            catalog.push(Choice::new(catalog.len(), element_text(element), value));
        }
    }

    Ok(catalog)
}

/// First choice whose label equals `label` exactly
pub fn find_by_label<'a>(catalog: &'a [Choice], label: &str) -> Option<&'a Choice> {
    catalog.iter().find(|choice| choice.label == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACULTIES: &str = r#"
        <html><body><ul>
          <li><a href="faculty.php?f=I">Informatik</a></li>
          <li>no link here</li>
          <li><span><a href="faculty.php?f=R">  Recht
              </a></span></li>
        </ul></body></html>"#;

    #[test]
    fn test_links_catalog() {
        let catalog = links_catalog(FACULTIES).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0], Choice::new(0, "Informatik", "faculty.php?f=I"));
        assert_eq!(catalog[1].index, 1);
        assert_eq!(catalog[1].label, "Recht");
        assert_eq!(catalog[1].value, "faculty.php?f=R");
    }

    #[test]
    fn test_form_catalog_reads_only_named_form() {
        let html = r##"
            <form name="other"><select><option value="x">X</option></select></form>
            <form name="form33"><select name="identifier[]">
              <option value="">-- bitte wählen --</option>
              <option value="#SPLUS1A">Gruppe A</option>
            </select></form>"##;
        let catalog = form_catalog(html, "form33").unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].value, "");
        assert_eq!(catalog[1], Choice::new(1, "Gruppe A", "#SPLUS1A"));
    }

    #[test]
    fn test_form_catalog_without_form_is_empty() {
        assert!(form_catalog("<p>nothing</p>", "form33").unwrap().is_empty());
    }

    #[test]
    fn test_marked_catalog() {
        let html = r##"
            <select>
              <option value="#SPLUS7A1B2C">IT-Management 5. Sem</option>
              <option value="ignored">Other</option>
              <option value="#SPLUS7A1B2D">Informatik 1. Sem</option>
            </select>"##;
        let catalog = marked_catalog(html, "SPLUS").unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[1].index, 1);
        assert_eq!(catalog[1].label, "Informatik 1. Sem");
    }

    #[test]
    fn test_find_by_label_first_match_wins() {
        let catalog = vec![
            Choice::new(0, "Recht", "a"),
            Choice::new(1, "Recht", "b"),
        ];
        assert_eq!(find_by_label(&catalog, "Recht").unwrap().value, "a");
        assert!(find_by_label(&catalog, "recht").is_none());
    }
}
