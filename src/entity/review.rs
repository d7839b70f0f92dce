use sea_orm::entity::prelude::*;

/// Sub-scores are stored as decimal(2,1) in the range 0.0..=5.0.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub room_id: i64,
    pub comment: Option<String>,
    pub cleanliness: Option<f64>,
    pub communication: Option<f64>,
    pub checkin: Option<f64>,
    pub accuracy: Option<f64>,
    pub location: Option<f64>,
    pub cost_effectiveness: Option<f64>,
    pub create_at: Option<DateTimeUtc>,
}

impl Model {
    /// Mean of the sub-scores that were given, if any.
    pub fn average(&self) -> Option<f64> {
        let scores: Vec<f64> = [
            self.cleanliness,
            self.communication,
            self.checkin,
            self.accuracy,
            self.location,
            self.cost_effectiveness,
        ]
        .into_iter()
        .flatten()
        .collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id",
        on_delete = "Cascade"
    )]
    Room,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
