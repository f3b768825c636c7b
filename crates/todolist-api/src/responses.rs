//! Row → wire conversions.

use todolist_db::models::{CategoryRow, CommentRow, GoalRow, UserRow};
use todolist_types::api::{CategoryResponse, CommentResponse, GoalResponse, ProfileResponse};

pub fn profile_response(user: &UserRow) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
    }
}

pub fn category_response(category: &CategoryRow) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        user: profile_response(&category.owner),
        title: category.title.clone(),
        created: category.created,
        updated: category.updated,
    }
}

pub fn goal_response(goal: &GoalRow) -> GoalResponse {
    GoalResponse {
        id: goal.id,
        user: goal.user_id,
        category: goal.category_id,
        title: goal.title.clone(),
        description: goal.description.clone(),
        status: goal.status,
        priority: goal.priority,
        due_date: goal.due_date,
        created: goal.created,
        updated: goal.updated,
    }
}

pub fn comment_response(comment: &CommentRow) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        user: profile_response(&comment.author),
        goal: comment.goal_id,
        text: comment.text.clone(),
        created: comment.created,
        updated: comment.updated,
    }
}
