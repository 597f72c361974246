// Kept in sync by hand with the DDL in `repository::context::SCHEMA_SQL`.

diesel::table! {
    rating_providers (id) {
        id -> BigInt,
        name -> Text,
    }
}

diesel::table! {
    properties (id) {
        id -> BigInt,
        name -> Nullable<Text>,
    }
}

diesel::table! {
    reviewers (id) {
        id -> BigInt,
        display_name -> Nullable<Text>,
        country_name -> Nullable<Text>,
        flag_name -> Nullable<Text>,
        review_group_name -> Nullable<Text>,
        room_type_name -> Nullable<Text>,
        country_id -> Nullable<Integer>,
        length_of_stay -> Nullable<Integer>,
        review_group_id -> Nullable<Integer>,
        room_type_id -> Nullable<Integer>,
        reviewed_count -> Nullable<Integer>,
        is_expert_reviewer -> Nullable<Bool>,
        is_show_global_icon -> Nullable<Bool>,
        is_show_reviewed_count -> Nullable<Bool>,
        created_at -> Text,
    }
}

diesel::table! {
    reviews (id) {
        id -> BigInt,
        property_id -> BigInt,
        provider_id -> BigInt,
        reviewer_id -> BigInt,
        rating -> Nullable<Double>,
        check_in_month_year -> Nullable<Text>,
        encrypted_review_data -> Nullable<Text>,
        formatted_rating -> Nullable<Text>,
        formatted_review_date -> Nullable<Text>,
        rating_text -> Nullable<Text>,
        responder_name -> Nullable<Text>,
        response_date_text -> Nullable<Text>,
        response_translate_source -> Nullable<Text>,
        review_comments -> Nullable<Text>,
        review_negatives -> Nullable<Text>,
        review_positives -> Nullable<Text>,
        review_provider_logo -> Nullable<Text>,
        review_provider_text -> Nullable<Text>,
        review_title -> Nullable<Text>,
        translate_source -> Nullable<Text>,
        translate_target -> Nullable<Text>,
        review_date -> Nullable<Text>,
        original_title -> Nullable<Text>,
        original_comment -> Nullable<Text>,
        formatted_response_date -> Nullable<Text>,
        is_show_review_response -> Nullable<Bool>,
        created_at -> Text,
    }
}

diesel::table! {
    review_grades (id) {
        id -> BigInt,
        review_id -> BigInt,
        category -> Text,
        score -> Double,
    }
}

diesel::table! {
    overall_by_providers (id) {
        id -> BigInt,
        review_id -> BigInt,
        provider_id -> BigInt,
        overall_score -> Nullable<Double>,
        review_count -> Nullable<Integer>,
        created_at -> Text,
    }
}

diesel::joinable!(reviews -> properties (property_id));
diesel::joinable!(reviews -> rating_providers (provider_id));
diesel::joinable!(reviews -> reviewers (reviewer_id));
diesel::joinable!(review_grades -> reviews (review_id));
diesel::joinable!(overall_by_providers -> reviews (review_id));
diesel::joinable!(overall_by_providers -> rating_providers (provider_id));

diesel::allow_tables_to_appear_in_same_query!(
    overall_by_providers,
    properties,
    rating_providers,
    review_grades,
    reviewers,
    reviews,
);
