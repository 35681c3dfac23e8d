use amzlisting_contracts::listing::{GeneratedListing, ListingSection, SEARCH_TERMS_MAX_BYTES};
use amzlisting_engine::{ApplicationState, CredentialStatus, SessionView};

pub const BILLING_DOCS_URL: &str = "https://ai.google.dev/gemini-api/docs/billing";

const CARD_RULE: &str = "------------------------------------------------------------";

pub fn credential_banner() -> String {
    [
        "API Key Required",
        "To use AI generation features, you must connect an API key from a paid Google Cloud project.",
        &format!("Learn more about billing: {BILLING_DOCS_URL}"),
        "Type /connect to connect an API key.",
    ]
    .join("\n")
}

pub fn render_section(listing: &GeneratedListing, section: ListingSection) -> String {
    let mut out = vec![
        CARD_RULE.to_string(),
        format!("{}  [/copy {}]", section.heading().to_uppercase(), section.key()),
        CARD_RULE.to_string(),
    ];
    match section {
        ListingSection::Bullets => {
            out.extend(listing.bullets.iter().map(|bullet| format!("  • {bullet}")));
        }
        _ => out.push(listing.section_text(section)),
    }
    if section == ListingSection::SearchTerms && !listing.search_terms_within_budget() {
        out.push(format!(
            "(warning: {} bytes, over the {SEARCH_TERMS_MAX_BYTES}-byte backend limit)",
            listing.search_terms_bytes()
        ));
    }
    out.join("\n")
}

pub fn render_listing(listing: &GeneratedListing) -> String {
    let mut out = vec!["2. Your Optimized Content".to_string(), String::new()];
    for section in ListingSection::ALL {
        out.push(render_section(listing, section));
        out.push(String::new());
    }
    out.push(
        "Pro Tip: review the generated copy so it matches your brand voice. Amazon's A10 \
         algorithm values relevance and high click-through rates."
            .to_string(),
    );
    out.join("\n")
}

/// Text view of the current state. `needs_key` is false for generators that run offline.
pub fn render_state(state: &ApplicationState, credential: CredentialStatus, needs_key: bool) -> String {
    let view = SessionView::of(state);
    let key_blocked = needs_key && credential.blocks_generation();
    let mut out = Vec::new();
    if key_blocked {
        out.push(credential_banner());
        out.push(String::new());
    }
    match &state.image {
        Some(image) => out.push(format!(
            "Mockup: {} ({} bytes)",
            image.mime_type,
            image.byte_len()
        )),
        None => out.push("1. Upload Your Mockup: /upload <path> (PNG, JPG or WEBP)".to_string()),
    }
    if let Some(error) = &state.error {
        out.push(format!("Error: {error}"));
    }
    match view {
        SessionView::Generating => out.push("Generating...".to_string()),
        SessionView::Listed => {
            if let Some(listing) = &state.listing {
                out.push(String::new());
                out.push(render_listing(listing));
                out.push(String::new());
                out.push("Start Over: /reset".to_string());
            }
        }
        SessionView::ImageSelected | SessionView::Errored if state.image.is_some() => {
            if key_blocked {
                out.push("Connect API Key to Generate (/connect)".to_string());
            } else {
                out.push("Generate Optimized Listing: /generate  (or /reset to remove)".to_string());
            }
        }
        _ => {}
    }
    out.join("\n")
}

pub fn credential_line(status: CredentialStatus, source: &str) -> String {
    match status {
        CredentialStatus::Present => format!("API key: connected ({source})"),
        CredentialStatus::Absent => format!("API key: missing ({source})"),
        CredentialStatus::Unknown => format!("API key: not checked ({source})"),
    }
}

#[cfg(test)]
mod tests {
    use amzlisting_contracts::image::UploadedImage;
    use amzlisting_contracts::listing::{GeneratedListing, ListingSection};
    use amzlisting_engine::{ApplicationState, CredentialStatus};

    use super::{render_listing, render_section, render_state, BILLING_DOCS_URL};

    fn listing() -> GeneratedListing {
        GeneratedListing {
            title: "Steel Bottle".to_string(),
            bullets: ["a", "b", "c", "d", "e"].map(str::to_string).to_vec(),
            description: "Keeps drinks cold.".to_string(),
            search_terms: "bottle flask".to_string(),
        }
    }

    #[test]
    fn listing_uses_card_headings_in_order() {
        let text = render_listing(&listing());
        let positions: Vec<usize> = [
            "PRODUCT TITLE",
            "5 KEY FEATURE BULLETS",
            "PRODUCT DESCRIPTION",
            "BACKEND SEARCH TERMS",
        ]
        .iter()
        .map(|heading| text.find(heading).unwrap_or(usize::MAX))
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{positions:?}");
        assert!(text.contains("  • c"));
    }

    #[test]
    fn oversized_search_terms_get_a_warning() {
        let mut listing = listing();
        listing.search_terms = "k".repeat(260);
        let text = render_section(&listing, ListingSection::SearchTerms);
        assert!(text.contains("260 bytes"));
    }

    #[test]
    fn absent_key_shows_banner_and_disables_generate() {
        let state = ApplicationState {
            image: Some(UploadedImage::from_bytes(b"png", "image/png")),
            ..ApplicationState::default()
        };
        let text = render_state(&state, CredentialStatus::Absent, true);
        assert!(text.starts_with("API Key Required"));
        assert!(text.contains(BILLING_DOCS_URL));
        assert!(text.contains("Connect API Key to Generate"));

        let offline = render_state(&state, CredentialStatus::Absent, false);
        assert!(!offline.contains("API Key Required"));
        assert!(offline.contains("Generate Optimized Listing"));
    }

    #[test]
    fn idle_state_prompts_for_upload() {
        let text = render_state(&ApplicationState::default(), CredentialStatus::Present, true);
        assert!(text.contains("1. Upload Your Mockup"));
        assert!(!text.contains("Generate"));
    }
}
