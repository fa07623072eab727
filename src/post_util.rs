use diesel::prelude::*;

use crate::constants::EXCERPT_LENGTH;

/// Derives a URL-safe slug candidate from a title. Lowercases, folds common
/// accented Latin letters to their ASCII base, keeps ASCII alphanumerics,
/// turns every other run of characters into a single hyphen, and trims
/// hyphens from both ends. Pure and idempotent; an empty result is the
/// caller's validation problem.
pub fn generate_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        let c = fold_diacritic(c);
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

fn fold_diacritic(c: char) -> char {
    match c.to_lowercase().next().unwrap_or(c) {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Probes the posts table for a free slug, appending `-1`, `-2`, ... to the
/// candidate until no other post holds it. `exclude_id` lets a post keep its
/// own slug across updates. Runs inside the caller's transaction so the
/// check and the write are a single logical operation; the UNIQUE constraint
/// on the column is the last line of defense against concurrent writers.
pub fn ensure_unique_slug(
    conn: &mut SqliteConnection,
    candidate: &str,
    exclude_id: Option<&str>,
) -> Result<String, diesel::result::Error> {
    use crate::schema::posts::dsl::*;

    let mut current = candidate.to_string();
    let mut counter = 1;

    loop {
        let existing: Option<String> = posts
            .filter(slug.eq(&current))
            .select(id)
            .first(conn)
            .optional()?;

        match existing {
            None => return Ok(current),
            Some(ref existing_id) if Some(existing_id.as_str()) == exclude_id => {
                return Ok(current)
            }
            Some(_) => {
                current = format!("{}-{}", candidate, counter);
                counter += 1;
            }
        }
    }
}

/// Strips tags from sanitized HTML and truncates to the excerpt length.
/// Used when a post is created or its content changes without an explicit
/// excerpt.
pub fn derive_excerpt(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.chars().take(EXCERPT_LENGTH).collect::<String>().trim().to_string()
}

/// Computes the `published_at` column value after a publish flag flip.
/// The timestamp is stamped exactly once, on the first transition to
/// published; unpublishing and republishing leave it untouched.
pub fn publish_transition(
    existing_published_at: Option<&str>,
    requested_published: bool,
    now: &str,
) -> Option<String> {
    match existing_published_at {
        Some(ts) => Some(ts.to_string()),
        None if requested_published => Some(now.to_string()),
        None => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::models::NewPost;

    fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        crate::apply_schema(&mut conn).unwrap();
        conn
    }

    fn insert_post(conn: &mut SqliteConnection, post_id: &str, post_slug: &str) {
        use crate::schema::posts;

        let new_post = NewPost {
            id: post_id,
            title: "t",
            slug: post_slug,
            content: "<p>c</p>",
            excerpt: "",
            hero_image: None,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            og_image: None,
            published: false,
            published_at: None,
            created_at: "2026-01-01T00:00:00+00:00",
            updated_at: "2026-01-01T00:00:00+00:00",
        };
        diesel::insert_into(posts::table)
            .values(&new_post)
            .execute(conn)
            .unwrap();
    }

    #[test]
    fn free_candidate_is_returned_unchanged() {
        let mut conn = test_conn();
        assert_eq!(
            ensure_unique_slug(&mut conn, "hello-world", None).unwrap(),
            "hello-world"
        );
    }

    #[test]
    fn collisions_get_increasing_suffixes() {
        let mut conn = test_conn();
        insert_post(&mut conn, "p1", "hello-world");
        assert_eq!(
            ensure_unique_slug(&mut conn, "hello-world", None).unwrap(),
            "hello-world-1"
        );

        insert_post(&mut conn, "p2", "hello-world-1");
        assert_eq!(
            ensure_unique_slug(&mut conn, "hello-world", None).unwrap(),
            "hello-world-2"
        );
    }

    #[test]
    fn a_post_keeps_its_own_slug_on_update() {
        let mut conn = test_conn();
        insert_post(&mut conn, "p1", "hello-world");
        assert_eq!(
            ensure_unique_slug(&mut conn, "hello-world", Some("p1")).unwrap(),
            "hello-world"
        );
        // A different post still has to move aside.
        assert_eq!(
            ensure_unique_slug(&mut conn, "hello-world", Some("p2")).unwrap(),
            "hello-world-1"
        );
    }

    #[test]
    fn it_slugifies_a_title() {
        assert_eq!(generate_slug("Hello, World!"), "hello-world");
    }

    #[test]
    fn it_collapses_separator_runs() {
        assert_eq!(generate_slug("a  --  b"), "a-b");
    }

    #[test]
    fn it_trims_leading_and_trailing_separators() {
        assert_eq!(generate_slug("  ?hello?  "), "hello");
    }

    #[test]
    fn it_folds_accented_letters() {
        assert_eq!(generate_slug("café au lait"), "cafe-au-lait");
        assert_eq!(generate_slug("Über Äpfel"), "uber-apfel");
    }

    #[test]
    fn it_drops_characters_it_cannot_fold() {
        assert_eq!(generate_slug("日本 guide"), "guide");
    }

    #[test]
    fn it_yields_empty_for_symbol_soup() {
        assert_eq!(generate_slug("!!! ???"), "");
    }

    #[test]
    fn slug_generation_is_idempotent() {
        for input in ["Hello, World!", "a  --  b", "café au lait", "2026 roundup"] {
            let once = generate_slug(input);
            assert_eq!(generate_slug(&once), once);
        }
    }

    #[test]
    fn excerpt_strips_tags_and_truncates() {
        let html = "<p>Some <strong>bold</strong> text</p>";
        assert_eq!(derive_excerpt(html), "Some bold text");

        let long = format!("<p>{}</p>", "x".repeat(500));
        assert_eq!(derive_excerpt(&long).len(), EXCERPT_LENGTH);
    }

    #[test]
    fn first_publish_stamps_timestamp() {
        assert_eq!(
            publish_transition(None, true, "2026-01-01T00:00:00+00:00"),
            Some("2026-01-01T00:00:00+00:00".into())
        );
    }

    #[test]
    fn unpublish_preserves_timestamp() {
        assert_eq!(
            publish_transition(Some("2026-01-01T00:00:00+00:00"), false, "2026-02-01T00:00:00+00:00"),
            Some("2026-01-01T00:00:00+00:00".into())
        );
    }

    #[test]
    fn republish_does_not_restamp() {
        assert_eq!(
            publish_transition(Some("2026-01-01T00:00:00+00:00"), true, "2026-02-01T00:00:00+00:00"),
            Some("2026-01-01T00:00:00+00:00".into())
        );
    }

    #[test]
    fn draft_without_history_stays_unstamped() {
        assert_eq!(publish_transition(None, false, "2026-01-01T00:00:00+00:00"), None);
    }
}
