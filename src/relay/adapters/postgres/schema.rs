//! Diesel schema for relay persistence.

diesel::table! {
    /// Durable chat history, one row per message identifier.
    chat_messages (id) {
        /// Opaque message identifier.
        #[max_length = 128]
        id -> Varchar,
        /// Author identifier.
        #[max_length = 256]
        author -> Varchar,
        /// Message text.
        content -> Text,
        /// Ingestion timestamp.
        created_at -> Timestamptz,
        /// Insertion sequence, used to break timestamp ties.
        stored_seq -> Int8,
    }
}

diesel::table! {
    /// Append-only bus log shared by every topic.
    bus_records (record_offset) {
        /// Monotonic log position.
        record_offset -> Int8,
        /// Topic name.
        #[max_length = 255]
        topic -> Varchar,
        /// Partitioning key.
        #[max_length = 128]
        record_key -> Varchar,
        /// Raw payload.
        payload -> Bytea,
        /// Append timestamp.
        published_at -> Timestamptz,
    }
}

diesel::table! {
    /// Last committed log position per consumer and topic.
    bus_consumer_offsets (consumer, topic) {
        /// Consumer name.
        #[max_length = 255]
        consumer -> Varchar,
        /// Topic name.
        #[max_length = 255]
        topic -> Varchar,
        /// Offset of the last record the consumer has processed.
        committed_offset -> Int8,
        /// Last commit timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(bus_records, bus_consumer_offsets);
