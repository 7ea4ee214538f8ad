diesel::table! {
    personalities (id) {
        id -> Integer,
        name -> Text,
        file_key -> Text,
        quotes_count -> Integer,
    }
}

diesel::table! {
    quotes (id) {
        id -> Integer,
        personality_id -> Integer,
        number -> Integer,
        content -> Text,
        upvotes -> Integer,
        downvotes -> Integer,
        created_at -> BigInt,
        last_used -> Nullable<BigInt>,
        use_count -> Integer,
    }
}

diesel::table! {
    commands (id) {
        id -> Integer,
        user_id -> Text,
        command -> Text,
        quote_id -> Nullable<Integer>,
        created_at -> BigInt,
    }
}

diesel::table! {
    votes (id) {
        id -> Integer,
        user_id -> Text,
        quote_id -> Integer,
        vote -> Integer,
        created_at -> BigInt,
    }
}

diesel::table! {
    stats (id) {
        id -> Integer,
        personality_id -> Integer,
        total_quotes_used -> Integer,
        total_upvotes -> Integer,
        total_downvotes -> Integer,
        updated_at -> BigInt,
    }
}

diesel::joinable!(quotes -> personalities (personality_id));
diesel::joinable!(stats -> personalities (personality_id));
diesel::joinable!(votes -> quotes (quote_id));
diesel::joinable!(commands -> quotes (quote_id));

diesel::allow_tables_to_appear_in_same_query!(personalities, quotes, commands, votes, stats);
