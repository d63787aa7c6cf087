// Two-tier collection detection from navigation markup

use crate::normalize::{clean_category_name, is_valid_category_name};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use url::Url;

static NAV_CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("nav, header, div").unwrap());
static FLAT_CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("nav, header, aside, ul, div").unwrap());
static DROPDOWN_CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul, div").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static UL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul").unwrap());

static NAV_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(nav|menu|header)").unwrap());
static FLAT_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(nav|menu|navigation|header|sidebar)").unwrap());
static SUBMENU_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(sub|dropdown|children|menu)").unwrap());
static DROPDOWN_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(dropdown|submenu|sub-menu|mega-menu)").unwrap());
static NUMERIC_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/\d+/?$").unwrap());

/// URL path fragments that mark a link as a category listing.
const CATEGORY_INDICATORS: &[&str] = &[
    "/category/",
    "/categories/",
    "/collection/",
    "/collections/",
    "/shop/",
    "/products/",
    "/catalog/",
    "/browse/",
];

/// URL path fragments that mark a link as a single product page.
const PRODUCT_INDICATORS: &[&str] = &["/product/", "/item/", "/p/", "/detail/", "/view/"];

/// One detected collection: a listing URL plus its place in the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionNode {
    pub url: String,
    pub category: String,
    pub subcategory: Option<String>,
}

fn class_attr<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().attr("class").unwrap_or("")
}

fn element_text(el: &ElementRef) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn direct_children<'a>(el: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap).collect()
}

fn resolve(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let mut url = Url::parse(base).ok()?.join(href).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}

/// Detect collections from a rendered page, hierarchical tier first, then
/// a flat navigation scan for anything the hierarchy missed. A URL claimed
/// by the hierarchical tier is never re-listed flat, and a flat name
/// already covered by a hierarchical entry is dropped.
pub fn detect_collections(html: &str, base_url: &str) -> BTreeMap<String, CollectionNode> {
    let document = Html::parse_document(html);
    let mut collections: BTreeMap<String, CollectionNode> = BTreeMap::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    detect_hierarchical(&document, base_url, &mut collections, &mut seen_urls);

    let flat = detect_flat_categories(&document, base_url);
    for (name, url) in flat {
        if seen_urls.contains(&url) {
            continue;
        }
        let clean_name = clean_category_name(&name);
        if !is_valid_category_name(&name, &clean_name) {
            continue;
        }

        let covered = collections.keys().any(|existing| existing.contains(&clean_name));
        if covered {
            debug!("Flat category '{}' already covered by hierarchy", clean_name);
            continue;
        }

        seen_urls.insert(url.clone());
        insert_collection(
            &mut collections,
            clean_name.clone(),
            CollectionNode {
                url,
                category: clean_name,
                subcategory: None,
            },
        );
    }

    info!("Detected {} collections", collections.len());
    collections
}

fn insert_collection(
    collections: &mut BTreeMap<String, CollectionNode>,
    full_name: String,
    node: CollectionNode,
) {
    if let Some(existing) = collections.get(&full_name) {
        if existing.url != node.url {
            warn!(
                "Collection name collision for '{}': keeping {}, dropping {}",
                full_name, existing.url, node.url
            );
        }
        return;
    }
    collections.insert(full_name, node);
}

fn detect_hierarchical(
    document: &Html,
    base_url: &str,
    collections: &mut BTreeMap<String, CollectionNode>,
    seen_urls: &mut HashSet<String>,
) {
    for nav in document
        .select(&NAV_CONTAINER_SEL)
        .filter(|el| el.value().name() != "div" || NAV_CLASS_RE.is_match(class_attr(el)))
    {
        let mut items: Vec<ElementRef> = direct_children(&nav)
            .into_iter()
            .filter(|c| c.value().name() == "li")
            .collect();
        if items.is_empty()
            && let Some(top_ul) = direct_children(&nav)
                .into_iter()
                .find(|c| c.value().name() == "ul")
        {
            items = direct_children(&top_ul)
                .into_iter()
                .filter(|c| c.value().name() == "li")
                .collect();
        }

        for item in items {
            let Some(submenu) = find_submenu(&item) else {
                continue;
            };

            let raw_parent = parent_label(&item, &submenu);
            let parent_name = clean_category_name(&raw_parent);
            if !is_valid_category_name(&raw_parent, &parent_name) {
                continue;
            }
            debug!("Found parent category: {}", parent_name);

            for sub_link in submenu.select(&LINK_SEL) {
                let raw_sub = element_text(&sub_link);
                let sub_name = clean_category_name(&raw_sub);
                if !is_valid_category_name(&raw_sub, &sub_name) {
                    continue;
                }
                let Some(sub_url) = sub_link
                    .value()
                    .attr("href")
                    .and_then(|href| resolve(base_url, href))
                else {
                    continue;
                };
                if !seen_urls.insert(sub_url.clone()) {
                    continue;
                }

                let full_name = format!("{} > {}", parent_name, sub_name);
                debug!("Found hierarchical collection: {}", full_name);
                insert_collection(
                    collections,
                    full_name,
                    CollectionNode {
                        url: sub_url,
                        category: parent_name.clone(),
                        subcategory: Some(sub_name),
                    },
                );
            }
        }
    }
}

/// A nav item's submenu: a direct ul/div child with submenu-ish classes,
/// else a direct ul child, else the first descendant ul that actually
/// contains links.
fn find_submenu<'a>(item: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let children = direct_children(item);

    if let Some(submenu) = children.iter().find(|c| {
        matches!(c.value().name(), "ul" | "div") && SUBMENU_CLASS_RE.is_match(class_attr(c))
    }) {
        return Some(*submenu);
    }

    if let Some(submenu) = children.iter().find(|c| c.value().name() == "ul") {
        return Some(*submenu);
    }

    item.select(&UL_SEL)
        .find(|ul| ul.select(&LINK_SEL).next().is_some())
}

/// The parent item's own label: its direct child link, else the first
/// direct child button/span/div that is not the submenu.
fn parent_label(item: &ElementRef, submenu: &ElementRef) -> String {
    let children = direct_children(item);

    if let Some(link) = children.iter().find(|c| c.value().name() == "a") {
        return element_text(link);
    }

    for child in &children {
        if matches!(child.value().name(), "button" | "span" | "div") && child.id() != submenu.id() {
            let text = element_text(child);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Flat navigation scan: every link inside nav-shaped containers and
/// dropdown menus, filtered down to plausible category listings.
fn detect_flat_categories(document: &Html, base_url: &str) -> Vec<(String, String)> {
    let mut categories: Vec<(String, String)> = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    let base_trimmed = base_url.trim_end_matches('/');
    let base_domain = Url::parse(base_url)
        .ok()
        .and_then(|u| u.domain().map(str::to_string));

    for nav in document.select(&FLAT_CONTAINER_SEL).filter(|el| {
        matches!(el.value().name(), "nav" | "header" | "aside")
            || FLAT_CLASS_RE.is_match(class_attr(el))
    }) {
        for link in nav.select(&LINK_SEL) {
            let name = element_text(&link);
            if name.len() < 2 {
                continue;
            }
            let Some(url) = link
                .value()
                .attr("href")
                .and_then(|href| resolve(base_url, href))
            else {
                continue;
            };
            if seen_urls.contains(&url) || url.trim_end_matches('/') == base_trimmed {
                continue;
            }
            if let (Some(base_domain), Ok(parsed)) = (&base_domain, Url::parse(&url))
                && let Some(link_domain) = parsed.domain()
                && link_domain != base_domain.as_str()
            {
                continue;
            }

            let path = Url::parse(&url)
                .map(|u| u.path().to_lowercase())
                .unwrap_or_default();

            // A /product/123 style link is a product, not a category.
            if PRODUCT_INDICATORS.iter().any(|p| path.contains(p))
                && NUMERIC_TAIL_RE.is_match(&path)
            {
                continue;
            }

            let is_category_url = CATEGORY_INDICATORS.iter().any(|p| path.contains(p));
            let reasonable_length = name.len() <= 50;

            if is_category_url || reasonable_length {
                seen_urls.insert(url.clone());
                debug!("Found category: {} -> {}", name, url);
                categories.push((name, url));
            }
        }
    }

    for dropdown in document
        .select(&DROPDOWN_CONTAINER_SEL)
        .filter(|el| DROPDOWN_CLASS_RE.is_match(class_attr(el)))
    {
        for link in dropdown.select(&LINK_SEL) {
            let name = element_text(&link);
            if name.len() < 2 {
                continue;
            }
            let Some(url) = link
                .value()
                .attr("href")
                .and_then(|href| resolve(base_url, href))
            else {
                continue;
            };
            if seen_urls.insert(url.clone()) {
                debug!("Found category from dropdown: {} -> {}", name, url);
                categories.push((name, url));
            }
        }
    }

    categories
}
