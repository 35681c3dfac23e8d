use amzlisting_contracts::listing::GeneratedListing;
use image::GenericImageView;
use sha2::{Digest, Sha256};

use crate::error::GenerationError;
use crate::generator::{ListingGenerator, ListingRequest};

/// Offline generator: a deterministic listing derived from the image bytes.
pub struct DryrunListingGenerator;

impl ListingGenerator for DryrunListingGenerator {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn requires_credential(&self) -> bool {
        false
    }

    fn generate(&self, request: &ListingRequest<'_>) -> Result<GeneratedListing, GenerationError> {
        let bytes = request.image.decoded_bytes().map_err(|err| {
            GenerationError::format(format!("dryrun could not decode image payload: {err}"))
        })?;
        let digest = hex::encode(Sha256::digest(&bytes));
        let short_id = &digest[..8];
        let dims = image::load_from_memory(&bytes)
            .ok()
            .map(|decoded| decoded.dimensions())
            .map(|(width, height)| format!("{width}x{height}"))
            .unwrap_or_else(|| "unknown-size".to_string());

        Ok(GeneratedListing {
            title: format!("Dryrun Product {short_id} - Sample Listing for {} Mockup", request.image.mime_type),
            bullets: vec![
                format!("SAMPLE SOURCE: generated offline from a {dims} mockup."),
                "DETERMINISTIC OUTPUT: the same image always yields the same copy.".to_string(),
                "NO NETWORK: useful for checking the listing layout and copy actions.".to_string(),
                format!("MODEL: {}.", request.model),
                format!("FINGERPRINT: sha256 {short_id}."),
            ],
            description: format!(
                "This placeholder listing was produced without calling a generation service. \
                 The uploaded {} image ({} bytes, {dims}) has fingerprint {digest}.",
                request.image.mime_type,
                bytes.len()
            ),
            search_terms: format!("dryrun sample listing mockup {short_id}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use amzlisting_contracts::image::UploadedImage;
    use image::{ImageFormat, Rgb, RgbImage};

    use super::DryrunListingGenerator;
    use crate::generator::{ListingGenerator, ListingRequest};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 80, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .expect("encode test png");
        out.into_inner()
    }

    #[test]
    fn output_is_deterministic_and_schema_shaped() -> anyhow::Result<()> {
        let image = UploadedImage::from_bytes(&png_bytes(12, 7), "image/png");
        let request = ListingRequest {
            image: &image,
            model: "dryrun-listing-1",
            api_key: None,
        };
        let first = DryrunListingGenerator.generate(&request)?;
        let second = DryrunListingGenerator.generate(&request)?;

        assert_eq!(first, second);
        assert_eq!(first.bullets.len(), 5);
        assert!(first.bullets[0].contains("12x7"));
        assert!(first.search_terms_within_budget());
        Ok(())
    }

    #[test]
    fn different_images_get_different_fingerprints() -> anyhow::Result<()> {
        let a = UploadedImage::from_bytes(&png_bytes(4, 4), "image/png");
        let b = UploadedImage::from_bytes(&png_bytes(5, 4), "image/png");
        let listing_a = DryrunListingGenerator.generate(&ListingRequest {
            image: &a,
            model: "dryrun-listing-1",
            api_key: None,
        })?;
        let listing_b = DryrunListingGenerator.generate(&ListingRequest {
            image: &b,
            model: "dryrun-listing-1",
            api_key: None,
        })?;
        assert_ne!(listing_a.title, listing_b.title);
        Ok(())
    }

    #[test]
    fn undecodable_images_still_produce_a_listing() -> anyhow::Result<()> {
        let image = UploadedImage::from_bytes(b"not really a png", "image/png");
        let listing = DryrunListingGenerator.generate(&ListingRequest {
            image: &image,
            model: "dryrun-listing-1",
            api_key: None,
        })?;
        assert!(listing.bullets[0].contains("unknown-size"));
        Ok(())
    }
}
