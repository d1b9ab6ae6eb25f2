use crate::{
    jwt::SessionData,
    schema::{Recipe, UserRole},
};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMarks,
            ActionType::ManageOwnSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMarks,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
            ActionType::ManageTags,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnMarks,
    ManageOwnSubscriptions,

    ManageAllRecipes,
    ManageTags,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find(|(role, _)| *role == session.role)
            .map(|(_, actions)| actions.contains(&self))
            .unwrap_or(false)
    }
}

/// Admins may edit any recipe, everyone else only their own.
pub fn can_edit_recipe(session: &SessionData, recipe: &Recipe) -> bool {
    ActionType::ManageAllRecipes.authenticate(session)
        || (recipe.author_id == session.user_id
            && ActionType::ManageOwnRecipes.authenticate(session))
}
