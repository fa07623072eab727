diesel::table! {
    posts (id) {
        id -> Text,
        title -> Text,
        slug -> Text,
        content -> Text,
        excerpt -> Text,
        hero_image -> Nullable<Text>,
        meta_title -> Nullable<Text>,
        meta_description -> Nullable<Text>,
        meta_keywords -> Nullable<Text>,
        og_image -> Nullable<Text>,
        published -> Bool,
        published_at -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    pages (id) {
        id -> Text,
        slug -> Text,
        title -> Text,
        content -> Text,
        active -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    links (id) {
        id -> Text,
        title -> Text,
        url -> Text,
        icon -> Nullable<Text>,
        logo_image -> Nullable<Text>,
        color -> Nullable<Text>,
        active -> Bool,
        position -> Integer,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    mid_contents (id) {
        id -> Text,
        image -> Nullable<Text>,
        headline -> Text,
        description -> Text,
        link_buttons -> Text,
        position -> Integer,
        active -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    uploads (id) {
        id -> Text,
        filename -> Text,
        original -> Text,
        path -> Text,
        mime_type -> Text,
        size -> Integer,
        width -> Nullable<Integer>,
        height -> Nullable<Integer>,
        created_at -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> Text,
        email -> Text,
        password -> Text,
        name -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    settings (id) {
        id -> Text,
        site_title -> Text,
        site_description -> Text,
        site_url -> Text,
        site_logo -> Nullable<Text>,
        hero_title -> Text,
        hero_subtitle -> Text,
        hero_image -> Nullable<Text>,
        meta_title -> Text,
        meta_description -> Text,
        og_image -> Nullable<Text>,
        theme -> Text,
        social_links -> Text,
        footer_text -> Text,
        favicon -> Nullable<Text>,
        updated_at -> Text,
    }
}

diesel::table! {
    sessions (token) {
        token -> Text,
        user_id -> Text,
        expires_at -> Text,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    posts,
    pages,
    links,
    mid_contents,
    uploads,
    users,
    settings,
    sessions,
);
