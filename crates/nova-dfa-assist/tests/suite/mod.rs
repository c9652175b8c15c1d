mod fixture;
mod pipeline;
mod scenarios;
