pub mod match_request;
pub mod match_response;

pub use match_request::{ExplainRequest, MatchRequest, RefineRequest, SimilarUsersRequest};
pub use match_response::{
    ExplainResponse, MatchResponse, ProjectView, SimilarUser, SimilarUsersResponse,
};
