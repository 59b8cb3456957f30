use crate::schema::project::projects;
use crate::schema::tasks::tasks;

diesel::table! {
    objectives (id) {
        id -> Uuid,
        org_id -> Uuid,
        owner_id -> Uuid,
        parent_id -> Nullable<Uuid>,
        title -> Varchar,
        description -> Nullable<Text>,
        status -> Varchar,
        progress -> Int4,
        progress_source -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    key_results (id) {
        id -> Uuid,
        org_id -> Uuid,
        objective_id -> Uuid,
        title -> Varchar,
        start_value -> Numeric,
        current_value -> Numeric,
        target_value -> Numeric,
        unit -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    key_result_updates (id) {
        id -> Uuid,
        org_id -> Uuid,
        key_result_id -> Uuid,
        author_id -> Uuid,
        previous_value -> Numeric,
        new_value -> Numeric,
        note -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    objective_projects (id) {
        id -> Uuid,
        objective_id -> Uuid,
        project_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    objective_tasks (id) {
        id -> Uuid,
        objective_id -> Uuid,
        task_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    key_result_tasks (id) {
        id -> Uuid,
        key_result_id -> Uuid,
        task_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(key_results -> objectives (objective_id));
diesel::joinable!(key_result_updates -> key_results (key_result_id));
diesel::joinable!(objective_projects -> objectives (objective_id));
diesel::joinable!(objective_projects -> projects (project_id));
diesel::joinable!(objective_tasks -> objectives (objective_id));
diesel::joinable!(objective_tasks -> tasks (task_id));
diesel::joinable!(key_result_tasks -> key_results (key_result_id));
diesel::joinable!(key_result_tasks -> tasks (task_id));

diesel::allow_tables_to_appear_in_same_query!(
    objectives,
    key_results,
    key_result_updates,
    objective_projects,
    objective_tasks,
    key_result_tasks,
);
