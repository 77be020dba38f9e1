//! Esquema Diesel (mantenido a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    users (id) {
        id -> BigInt,
        first_name -> Text,
        last_name -> Text,
        email -> Text,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    form_progress (id) {
        id -> BigInt,
        user_id -> BigInt,
        form_type -> Text,
        form_data -> Jsonb,
        step_number -> Integer,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    form_submissions (id) {
        id -> BigInt,
        user_id -> BigInt,
        form_type -> Text,
        form_data -> Jsonb,
        status -> Text,
        submitted_at -> Timestamptz,
        reviewed_by -> Nullable<BigInt>,
        review_comments -> Nullable<Text>,
        reviewed_at -> Nullable<Timestamptz>,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(form_progress -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    form_progress,
    form_submissions,
);
