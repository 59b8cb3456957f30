use crate::schema::project::projects;

diesel::table! {
    tasks (id) {
        id -> Uuid,
        org_id -> Uuid,
        project_id -> Nullable<Uuid>,
        parent_id -> Nullable<Uuid>,
        title -> Text,
        completed -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(tasks -> projects (project_id));

diesel::allow_tables_to_appear_in_same_query!(tasks, projects);
