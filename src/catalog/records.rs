use super::types::{Candidate, Volume, VolumeInfo, VolumesResponse};

/// Converts a decoded volumes payload into candidates. Volumes without a
/// usable cover locator are dropped here and never enter the pipeline.
pub fn extract_candidates(response: &VolumesResponse) -> Vec<Candidate> {
    response
        .items
        .as_ref()
        .map(|items| items.iter().filter_map(candidate_from_volume).collect())
        .unwrap_or_default()
}

fn candidate_from_volume(volume: &Volume) -> Option<Candidate> {
    let info = volume.volume_info.as_ref()?;
    let cover_url = info
        .image_links
        .as_ref()
        .and_then(|links| links.thumbnail.as_ref().or(links.small_thumbnail.as_ref()))
        .filter(|url| !url.is_empty())?;

    Some(Candidate {
        id: pick_identifier(volume, info),
        title: info.title.clone().unwrap_or_default(),
        authors: info.authors.clone().unwrap_or_default(),
        publisher: info.publisher.clone(),
        published: info.published_date.clone(),
        cover_url: upgrade_to_https(cover_url),
    })
}

fn pick_identifier(volume: &Volume, info: &VolumeInfo) -> Option<String> {
    let identifiers = info.industry_identifiers.as_deref().unwrap_or_default();

    identifiers
        .iter()
        .find(|i| i.kind.as_deref() == Some("ISBN_13"))
        .and_then(|i| i.identifier.clone())
        .or_else(|| identifiers.iter().find_map(|i| i.identifier.clone()))
        .or_else(|| volume.id.clone())
        .filter(|id| !id.is_empty())
}

/// Catalog thumbnails are served with `http://` links; upgrade the scheme so
/// the cover fetch never goes out in the clear.
fn upgrade_to_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{ImageLinks, IndustryIdentifier};

    fn make_volume(
        id: &str,
        title: &str,
        identifiers: Vec<(&str, &str)>,
        thumbnail: Option<&str>,
    ) -> Volume {
        Volume {
            id: Some(id.to_string()),
            volume_info: Some(VolumeInfo {
                title: Some(title.to_string()),
                authors: Some(vec!["Author".into()]),
                publisher: Some("Publisher".into()),
                published_date: Some("2001".into()),
                industry_identifiers: Some(
                    identifiers
                        .into_iter()
                        .map(|(kind, value)| IndustryIdentifier {
                            kind: Some(kind.into()),
                            identifier: Some(value.into()),
                        })
                        .collect(),
                ),
                image_links: thumbnail.map(|t| ImageLinks {
                    thumbnail: Some(t.to_string()),
                    small_thumbnail: None,
                }),
            }),
        }
    }

    #[test]
    fn extracts_candidate_with_isbn13_preference() {
        let response = VolumesResponse {
            items: Some(vec![make_volume(
                "vol-1",
                "Dune",
                vec![("ISBN_10", "0441013597"), ("ISBN_13", "9780441013593")],
                Some("https://covers.example/dune.jpg"),
            )]),
            error: None,
        };

        let candidates = extract_candidates(&response);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id.as_deref(), Some("9780441013593"));
        assert_eq!(candidates[0].title, "Dune");
    }

    #[test]
    fn falls_back_to_any_identifier_then_volume_id() {
        let response = VolumesResponse {
            items: Some(vec![
                make_volume(
                    "vol-1",
                    "A",
                    vec![("OTHER", "OCLC:123")],
                    Some("https://covers.example/a.jpg"),
                ),
                make_volume("vol-2", "B", vec![], Some("https://covers.example/b.jpg")),
            ]),
            error: None,
        };

        let candidates = extract_candidates(&response);
        assert_eq!(candidates[0].id.as_deref(), Some("OCLC:123"));
        assert_eq!(candidates[1].id.as_deref(), Some("vol-2"));
    }

    #[test]
    fn drops_volumes_without_cover() {
        let response = VolumesResponse {
            items: Some(vec![
                make_volume("vol-1", "No Cover", vec![], None),
                make_volume("vol-2", "Cover", vec![], Some("https://covers.example/c.jpg")),
            ]),
            error: None,
        };

        let candidates = extract_candidates(&response);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Cover");
    }

    #[test]
    fn drops_empty_thumbnail_url() {
        let response = VolumesResponse {
            items: Some(vec![make_volume("vol-1", "Blank", vec![], Some(""))]),
            error: None,
        };

        assert!(extract_candidates(&response).is_empty());
    }

    #[test]
    fn upgrades_http_thumbnails() {
        let response = VolumesResponse {
            items: Some(vec![make_volume(
                "vol-1",
                "Plain",
                vec![],
                Some("http://covers.example/plain.jpg"),
            )]),
            error: None,
        };

        let candidates = extract_candidates(&response);
        assert_eq!(candidates[0].cover_url, "https://covers.example/plain.jpg");
    }

    #[test]
    fn falls_back_to_small_thumbnail() {
        let volume = Volume {
            id: Some("vol-1".into()),
            volume_info: Some(VolumeInfo {
                title: Some("Small".into()),
                authors: None,
                publisher: None,
                published_date: None,
                industry_identifiers: None,
                image_links: Some(ImageLinks {
                    thumbnail: None,
                    small_thumbnail: Some("https://covers.example/s.jpg".into()),
                }),
            }),
        };
        let response = VolumesResponse {
            items: Some(vec![volume]),
            error: None,
        };

        let candidates = extract_candidates(&response);
        assert_eq!(candidates[0].cover_url, "https://covers.example/s.jpg");
        assert!(candidates[0].authors.is_empty());
    }

    #[test]
    fn empty_response_yields_no_candidates() {
        let response = VolumesResponse {
            items: None,
            error: None,
        };
        assert!(extract_candidates(&response).is_empty());
    }
}
